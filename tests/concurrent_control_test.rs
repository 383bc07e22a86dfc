// ==========================================
// 并发控制测试
// ==========================================
// 职责: 验证并发写入下容量/单一 active 学年等不变量不被突破
// 说明: 每个线程使用独立的 Database（独立连接），模拟多实例部署
// ==========================================


#[cfg(test)]
mod concurrent_control_test {
    use academic_progression::db::Database;
    use academic_progression::domain::Track;
    use academic_progression::engine::{
        AlwaysOpen, AuditRecorder, Clock, CourseYearLifecycle, EngineError,
        EnrollmentEligibilityEngine, FixedClock,
    };
    use std::sync::{Arc, Barrier};
    use std::thread;

    use crate::test_helpers::{at, midnight, TestEnv, OPERATOR};

    fn enrollment_engine(db_path: &str) -> EnrollmentEligibilityEngine {
        let db = Database::open(db_path).unwrap();
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(at(2026, 9, 10)));
        EnrollmentEligibilityEngine::new(db, clock, AuditRecorder::none(), Arc::new(AlwaysOpen))
    }

    #[test]
    fn test_last_seat_race_across_connections() {
        let env = TestEnv::new();
        env.open_first_year();
        let (classroom, _) = env.staffed_classroom(1, Track::Sciences);
        for i in 0..4 {
            env.enrolled_student(&format!("Estudiante {}", i), &classroom);
        }
        let contenders = [env.admit("Rival A").id, env.admit("Rival B").id];

        let barrier = Arc::new(Barrier::new(contenders.len()));
        let handles: Vec<_> = contenders
            .iter()
            .map(|&student_id| {
                let barrier = barrier.clone();
                let db_path = env.db_path.clone();
                let classroom_id = classroom.id;
                thread::spawn(move || {
                    let engine = enrollment_engine(&db_path);
                    barrier.wait();
                    engine.enroll(student_id, classroom_id, Track::Sciences, OPERATOR)
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let succeeded = results.iter().filter(|r| r.is_ok()).count();
        let full = results
            .iter()
            .filter(|r| matches!(r, Err(e) if e.code() == "CLASSROOM_FULL"))
            .count();

        assert_eq!(succeeded, 1, "results: {:?}", results);
        assert_eq!(full, 1, "results: {:?}", results);
        assert_eq!(env.roster.classroom_occupancy(classroom.id).unwrap().seated, 5);
    }

    #[test]
    fn test_many_threads_share_one_engine_without_overbooking() {
        let env = TestEnv::new();
        env.open_first_year();
        let (classroom, _) = env.staffed_classroom(1, Track::Sciences);
        let students: Vec<i64> = (0..10)
            .map(|i| env.admit(&format!("Estudiante {}", i)).id)
            .collect();

        let engine = Arc::new(enrollment_engine(&env.db_path));
        let barrier = Arc::new(Barrier::new(students.len()));
        let handles: Vec<_> = students
            .into_iter()
            .map(|student_id| {
                let engine = engine.clone();
                let barrier = barrier.clone();
                let classroom_id = classroom.id;
                thread::spawn(move || {
                    barrier.wait();
                    engine.enroll(student_id, classroom_id, Track::Sciences, OPERATOR)
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 5);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| e.code() == "CLASSROOM_FULL"));
        assert_eq!(env.count_rows("enrollment"), 5);
    }

    #[test]
    fn test_concurrent_open_course_year_yields_single_active() {
        let env = TestEnv::new();

        let barrier = Arc::new(Barrier::new(2));
        let handles: Vec<_> = ["2026-2027 A", "2026-2027 B"]
            .into_iter()
            .map(|name| {
                let barrier = barrier.clone();
                let db_path = env.db_path.clone();
                thread::spawn(move || {
                    let db = Database::open(&db_path).unwrap();
                    let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(at(2026, 8, 1)));
                    let lifecycle = CourseYearLifecycle::new(db, clock, AuditRecorder::none());
                    barrier.wait();
                    lifecycle.open_course_year(
                        name,
                        midnight(2026, 9, 1),
                        midnight(2027, 7, 15),
                        OPERATOR,
                    )
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results.iter().any(|r| matches!(
            r,
            Err(EngineError::Conflict(reason)) if reason.code() == "ACTIVE_COURSE_YEAR_EXISTS"
        )));
        assert_eq!(env.count_rows("course_year"), 1);
    }
}

// ==========================================
// EnrollmentEligibilityEngine 集成测试
// ==========================================
// 覆盖: 注册校验顺序、事务原子性、调整注册
// ==========================================


#[cfg(test)]
mod enrollment_engine_test {
    use academic_progression::domain::{OperationType, Subject, Track};
    use academic_progression::engine::{AlwaysOpen, ConflictReason, EngineError};
    use std::sync::Arc;

    use crate::test_helpers::{at, conflict_code, midnight, not_found_code, TestEnv, OPERATOR};

    // ==========================================
    // enroll
    // ==========================================

    #[test]
    fn test_enroll_places_student_and_records_audit() {
        let env = TestEnv::new();
        let cy = env.open_first_year();
        let (classroom, _) = env.staffed_classroom(1, Track::Sciences);
        let student = env.admit("Ana Pérez");

        let enrollment = env
            .enrollments
            .enroll(student.id, classroom.id, Track::Sciences, "Registro Central")
            .unwrap();

        assert_eq!(enrollment.course_year_id, cy.id);
        assert_eq!(enrollment.classroom_id, classroom.id);
        assert_eq!(enrollment.enrollment_date, at(2026, 9, 10));

        let student = env.roster.get_student(student.id).unwrap();
        assert_eq!(student.classroom_id, Some(classroom.id));
        assert_eq!(student.track, Some(Track::Sciences));

        let audit = env.roster.recent_audit_entries(1).unwrap();
        assert_eq!(audit[0].operation, OperationType::Enroll.as_str());
        assert_eq!(audit[0].actor, "Registro Central");
    }

    #[test]
    fn test_enroll_without_any_course_year_is_not_found() {
        let env = TestEnv::new();
        let classroom = env.classroom(1, Track::Sciences);
        let student = env.admit("Ana Pérez");

        assert_eq!(
            not_found_code(env.enrollments.enroll(student.id, classroom.id, Track::Sciences, OPERATOR)),
            "NO_COURSE_YEAR"
        );
    }

    #[test]
    fn test_enroll_unknown_student_or_classroom_is_not_found() {
        let env = TestEnv::new();
        env.open_first_year();
        let (classroom, _) = env.staffed_classroom(1, Track::Sciences);
        let student = env.admit("Ana Pérez");

        assert_eq!(
            not_found_code(env.enrollments.enroll(999, classroom.id, Track::Sciences, OPERATOR)),
            "STUDENT_NOT_FOUND"
        );
        assert_eq!(
            not_found_code(env.enrollments.enroll(student.id, 999, Track::Sciences, OPERATOR)),
            "CLASSROOM_NOT_FOUND"
        );
    }

    #[test]
    fn test_enroll_twice_in_same_track_is_duplicate() {
        let env = TestEnv::new();
        env.open_first_year();
        let (room_1, _) = env.staffed_classroom(1, Track::Sciences);
        let (room_2, _) = env.staffed_classroom(2, Track::Sciences);
        let (student, _) = env.enrolled_student("Ana Pérez", &room_1);

        assert_eq!(
            conflict_code(env.enrollments.enroll(student.id, room_2.id, Track::Sciences, OPERATOR)),
            "DUPLICATE_ENROLLMENT"
        );
        assert_eq!(env.count_rows("enrollment"), 1);
    }

    #[test]
    fn test_enroll_track_mismatch_checked_before_capacity_and_staffing() {
        let env = TestEnv::new();
        env.open_first_year();
        // 未排课的文科教室: 方向不一致优先于师资不完整
        let letras_room = env.classroom(3, Track::Letras);
        let student = env.admit("Ana Pérez");

        assert_eq!(
            conflict_code(env.enrollments.enroll(student.id, letras_room.id, Track::Sciences, OPERATOR)),
            "TRACK_MISMATCH"
        );
    }

    #[test]
    fn test_enroll_withdrawn_student_is_rejected() {
        let env = TestEnv::new();
        env.open_first_year();
        let (classroom, _) = env.staffed_classroom(1, Track::Sciences);
        let student = env.admit("Ana Pérez");
        env.roster.withdraw_student(student.id, OPERATOR).unwrap();

        assert_eq!(
            conflict_code(env.enrollments.enroll(student.id, classroom.id, Track::Sciences, OPERATOR)),
            "STUDENT_INACTIVE"
        );

        // 复学后可注册
        env.roster.restore_student(student.id, OPERATOR).unwrap();
        env.enrollments
            .enroll(student.id, classroom.id, Track::Sciences, OPERATOR)
            .unwrap();
    }

    #[test]
    fn test_enroll_lifetime_limit() {
        let env = TestEnv::new();
        env.open_first_year();
        let (classroom, _) = env.staffed_classroom(1, Track::Sciences);
        let student = env.admit("Ana Pérez");

        for year in 2022..2025 {
            let cy = env.seed_closed_year(
                &format!("{}-{}", year, year + 1),
                midnight(year, 9, 1),
                midnight(year + 1, 7, 1),
            );
            env.seed_enrollment(student.id, classroom.id, Track::Sciences, cy);
        }

        assert_eq!(
            conflict_code(env.enrollments.enroll(student.id, classroom.id, Track::Sciences, OPERATOR)),
            "ENROLLMENT_LIMIT_REACHED"
        );
        assert_eq!(env.count_rows("enrollment"), 3);
    }

    #[test]
    fn test_enroll_with_unresolved_prior_year_subjects() {
        let env = TestEnv::new();
        env.open_first_year();
        let (classroom, teachers) = env.staffed_classroom(1, Track::Sciences);
        let student = env.admit("Ana Pérez");

        let past = env.seed_closed_year("2024-2025", midnight(2024, 9, 1), midnight(2025, 7, 1));
        env.seed_enrollment(student.id, classroom.id, Track::Sciences, past);
        env.seed_evaluation(student.id, teachers[0].id, Subject::Math, past, 2, at(2025, 5, 10));

        match env
            .enrollments
            .enroll(student.id, classroom.id, Track::Sciences, OPERATOR)
        {
            Err(EngineError::Conflict(ConflictReason::PriorYearUnresolved(missing))) => {
                assert_eq!(missing, vec![Subject::Informatics, Subject::PhysicalEd]);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_failed_track_can_be_repeated() {
        let env = TestEnv::new();
        env.open_first_year();
        let (classroom, teachers) = env.staffed_classroom(1, Track::Sciences);
        let student = env.admit("Ana Pérez");

        let past = env.seed_closed_year("2024-2025", midnight(2024, 9, 1), midnight(2025, 7, 1));
        env.seed_enrollment(student.id, classroom.id, Track::Sciences, past);
        for (teacher, grade) in teachers.iter().zip([4, 2, 5]) {
            env.seed_evaluation(student.id, teacher.id, teacher.subject, past, grade, at(2025, 5, 10));
        }

        assert!(!env.tracker.has_ever_completed_track(student.id, Track::Sciences).unwrap());
        env.enrollments
            .enroll(student.id, classroom.id, Track::Sciences, OPERATOR)
            .unwrap();
        assert_eq!(env.enrollments.list_enrollments_for_student(student.id).unwrap().len(), 2);
    }

    #[test]
    fn test_rejected_enroll_writes_nothing() {
        let env = TestEnv::new();
        env.open_first_year();
        let classroom = env.classroom(1, Track::Sciences);
        let student = env.admit("Ana Pérez");
        let audit_before = env.count_rows("audit_log");

        assert_eq!(
            conflict_code(env.enrollments.enroll(student.id, classroom.id, Track::Sciences, OPERATOR)),
            "INCOMPLETE_STAFFING"
        );
        assert_eq!(env.count_rows("enrollment"), 0);
        assert_eq!(env.count_rows("audit_log"), audit_before);
        assert_eq!(env.roster.get_student(student.id).unwrap().classroom_id, None);
    }

    // ==========================================
    // update_enrollment
    // ==========================================

    #[test]
    fn test_update_enrollment_outside_window_is_rejected() {
        let env = TestEnv::new();
        env.open_first_year();
        let (room_1, _) = env.staffed_classroom(1, Track::Sciences);
        let (room_2, _) = env.staffed_classroom(2, Track::Sciences);
        let (_, enrollment) = env.enrolled_student("Ana Pérez", &room_1);

        // 2026-09 不在 7、8 月窗口
        assert_eq!(
            conflict_code(env.enrollments.update_enrollment(
                enrollment.id,
                room_2.id,
                Track::Sciences,
                OPERATOR
            )),
            "REENROLLMENT_WINDOW_CLOSED"
        );
    }

    #[test]
    fn test_update_enrollment_moves_student_within_window() {
        let env = TestEnv::new();
        env.open_first_year();
        let (room_1, _) = env.staffed_classroom(1, Track::Sciences);
        let (room_2, _) = env.staffed_classroom(2, Track::Sciences);
        let (student, enrollment) = env.enrolled_student("Ana Pérez", &room_1);

        env.set_now(at(2027, 7, 5));
        let moved = env
            .enrollments
            .update_enrollment(enrollment.id, room_2.id, Track::Sciences, OPERATOR)
            .unwrap();

        assert_eq!(moved.id, enrollment.id);
        assert_eq!(moved.classroom_id, room_2.id);
        assert_eq!(moved.enrollment_date, at(2027, 7, 5));
        assert_eq!(
            env.roster.get_student(student.id).unwrap().classroom_id,
            Some(room_2.id)
        );
        assert_eq!(env.roster.classroom_occupancy(room_1.id).unwrap().seated, 0);
        assert_eq!(env.roster.classroom_occupancy(room_2.id).unwrap().seated, 1);
    }

    #[test]
    fn test_update_enrollment_revalidates_capacity_track_and_staffing() {
        let env = TestEnv::with_window(Arc::new(AlwaysOpen));
        env.open_first_year();
        let (room_1, _) = env.staffed_classroom(1, Track::Sciences);
        let (full_room, _) = env.staffed_classroom(2, Track::Sciences);
        let unstaffed_room = env.classroom(3, Track::Sciences);
        let (letras_room, _) = env.staffed_classroom(4, Track::Letras);
        let (_, enrollment) = env.enrolled_student("Ana Pérez", &room_1);
        for i in 0..5 {
            env.enrolled_student(&format!("Estudiante {}", i), &full_room);
        }

        assert_eq!(
            conflict_code(env.enrollments.update_enrollment(
                enrollment.id,
                full_room.id,
                Track::Sciences,
                OPERATOR
            )),
            "CLASSROOM_FULL"
        );
        assert_eq!(
            conflict_code(env.enrollments.update_enrollment(
                enrollment.id,
                unstaffed_room.id,
                Track::Sciences,
                OPERATOR
            )),
            "INCOMPLETE_STAFFING"
        );
        assert_eq!(
            conflict_code(env.enrollments.update_enrollment(
                enrollment.id,
                letras_room.id,
                Track::Letras,
                OPERATOR
            )),
            "TRACK_MISMATCH"
        );

        // 留在原教室: 不重复计算容量
        let same = env
            .enrollments
            .update_enrollment(enrollment.id, room_1.id, Track::Sciences, OPERATOR)
            .unwrap();
        assert_eq!(same.classroom_id, room_1.id);
    }

    #[test]
    fn test_update_enrollment_back_into_full_room_after_track_switch() {
        let env = TestEnv::with_window(Arc::new(AlwaysOpen));
        env.open_first_year();
        let (sciences_room, _) = env.staffed_classroom(1, Track::Sciences);
        let (letras_room, _) = env.staffed_classroom(6, Track::Letras);
        let (student, sciences) = env.enrolled_student("Ana Pérez", &sciences_room);

        // 同一学年再注册文科: 就坐移至文科教室
        env.enrollments
            .enroll(student.id, letras_room.id, Track::Letras, OPERATOR)
            .unwrap();
        assert_eq!(env.roster.classroom_occupancy(sciences_room.id).unwrap().seated, 0);
        for i in 0..5 {
            env.enrolled_student(&format!("Estudiante {}", i), &sciences_room);
        }

        // 注册记录的教室未变，但学生需重新就坐
        assert_eq!(
            conflict_code(env.enrollments.update_enrollment(
                sciences.id,
                sciences_room.id,
                Track::Sciences,
                OPERATOR
            )),
            "CLASSROOM_FULL"
        );
        assert_eq!(env.roster.classroom_occupancy(sciences_room.id).unwrap().seated, 5);
        assert_eq!(env.roster.classroom_occupancy(letras_room.id).unwrap().seated, 1);
        assert_eq!(
            env.roster.get_student(student.id).unwrap().classroom_id,
            Some(letras_room.id)
        );
    }

    #[test]
    fn test_update_enrollment_reseats_student_without_moving_enrollment() {
        let env = TestEnv::with_window(Arc::new(AlwaysOpen));
        env.open_first_year();
        let (sciences_room, _) = env.staffed_classroom(1, Track::Sciences);
        let (letras_room, _) = env.staffed_classroom(6, Track::Letras);
        let (student, sciences) = env.enrolled_student("Ana Pérez", &sciences_room);
        env.enrollments
            .enroll(student.id, letras_room.id, Track::Letras, OPERATOR)
            .unwrap();
        for i in 0..4 {
            env.enrolled_student(&format!("Estudiante {}", i), &sciences_room);
        }

        let updated = env
            .enrollments
            .update_enrollment(sciences.id, sciences_room.id, Track::Sciences, OPERATOR)
            .unwrap();

        assert_eq!(updated.classroom_id, sciences_room.id);
        assert_eq!(
            env.roster.get_student(student.id).unwrap().classroom_id,
            Some(sciences_room.id)
        );
        assert_eq!(env.roster.classroom_occupancy(sciences_room.id).unwrap().seated, 5);
        assert_eq!(env.roster.classroom_occupancy(letras_room.id).unwrap().seated, 0);
    }

    #[test]
    fn test_update_enrollment_of_closed_year_is_stale() {
        let env = TestEnv::new();
        let first = env.open_first_year();
        let (room_1, teachers) = env.staffed_classroom(1, Track::Sciences);
        let (room_2, _) = env.staffed_classroom(2, Track::Sciences);
        let (student, enrollment) = env.enrolled_student("Ana Pérez", &room_1);

        env.set_now(at(2027, 3, 1));
        env.grade_all(&student, &teachers, 2);
        env.roll_to_second_year(&first);

        assert_eq!(
            conflict_code(env.enrollments.update_enrollment(
                enrollment.id,
                room_2.id,
                Track::Sciences,
                OPERATOR
            )),
            "STALE_ENROLLMENT"
        );
        assert_eq!(
            not_found_code(env.enrollments.update_enrollment(999, room_2.id, Track::Sciences, OPERATOR)),
            "ENROLLMENT_NOT_FOUND"
        );
    }
}

// ==========================================
// 业务场景端到端测试
// ==========================================
// 覆盖: 师资不完整 / 教室满员 / 方向已完成 / 评分校验 / 结业门槛
// ==========================================


#[cfg(test)]
mod scenario_test {
    use academic_progression::domain::{CourseYearStatus, Subject, Track};
    use academic_progression::engine::{ConflictReason, EngineError};

    use crate::test_helpers::{at, conflict_code, TestEnv, OPERATOR};

    // ==========================================
    // 场景 A: 缺少信息学教师的理科教室不可注册
    // ==========================================
    #[test]
    fn test_enroll_rejected_when_classroom_staffing_incomplete() {
        let env = TestEnv::new();
        let cy = env.open_first_year();

        let classroom = env.classroom(1, Track::Sciences);
        for subject in [Subject::Math, Subject::PhysicalEd] {
            let teacher = env.hire(&format!("Profesor {}", subject), subject);
            env.roster
                .assign_teacher(classroom.id, teacher.id, OPERATOR)
                .unwrap();
        }
        let student = env.admit("Ana Pérez");

        let result = env
            .enrollments
            .enroll(student.id, classroom.id, Track::Sciences, OPERATOR);

        match result {
            Err(EngineError::Conflict(ConflictReason::IncompleteStaffing(missing))) => {
                assert_eq!(missing, vec![Subject::Informatics]);
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert!(!env
            .staffing
            .is_staffing_complete(classroom.id, Track::Sciences, cy.id)
            .unwrap());
        assert_eq!(env.count_rows("enrollment"), 0);
    }

    // ==========================================
    // 场景 B: 第 6 名学生注册满员教室被拒
    // ==========================================
    #[test]
    fn test_sixth_enrollment_rejected_when_classroom_full() {
        let env = TestEnv::new();
        env.open_first_year();

        let (classroom, _) = env.staffed_classroom(2, Track::Sciences);
        let seated: Vec<_> = (0..5)
            .map(|i| env.enrolled_student(&format!("Estudiante {}", i), &classroom).0)
            .collect();

        let sixth = env.admit("Estudiante 6");
        assert_eq!(
            conflict_code(env.enrollments.enroll(sixth.id, classroom.id, Track::Sciences, OPERATOR)),
            "CLASSROOM_FULL"
        );
        assert_eq!(env.roster.classroom_occupancy(classroom.id).unwrap().seated, 5);

        // 退学释放座位
        env.roster.withdraw_student(seated[0].id, OPERATOR).unwrap();
        env.enrollments
            .enroll(sixth.id, classroom.id, Track::Sciences, OPERATOR)
            .unwrap();
        assert_eq!(env.roster.classroom_occupancy(classroom.id).unwrap().seated, 5);
    }

    // ==========================================
    // 场景 C: 完成理科后只能注册文科
    // ==========================================
    #[test]
    fn test_completed_track_blocks_reenrollment_in_same_track() {
        let env = TestEnv::new();
        let first = env.open_first_year();

        let (sciences_room, sciences_teachers) = env.staffed_classroom(1, Track::Sciences);
        let (student, _) = env.enrolled_student("Carlos Díaz", &sciences_room);

        env.set_now(at(2027, 3, 10));
        for (teacher, grade) in sciences_teachers.iter().zip([4, 3, 3]) {
            env.evaluations
                .create_evaluation(student.id, teacher.id, grade, OPERATOR)
                .unwrap();
        }
        assert!(env
            .tracker
            .has_passed_track_in_course_year(student.id, Track::Sciences, first.id)
            .unwrap());

        let second = env.roll_to_second_year(&first);
        let (letras_room, _) = env.staffed_classroom(6, Track::Letras);

        match env
            .enrollments
            .enroll(student.id, sciences_room.id, Track::Sciences, OPERATOR)
        {
            Err(EngineError::Conflict(ConflictReason::TrackAlreadyCompleted(track))) => {
                assert_eq!(track, Track::Sciences);
            }
            other => panic!("unexpected: {:?}", other),
        }

        let enrollment = env
            .enrollments
            .enroll(student.id, letras_room.id, Track::Letras, OPERATOR)
            .unwrap();
        assert_eq!(enrollment.course_year_id, second.id);
        assert_eq!(enrollment.track, Track::Letras);

        let placed = env.roster.get_student(student.id).unwrap();
        assert_eq!(placed.classroom_id, Some(letras_room.id));
        assert_eq!(placed.track, Some(Track::Letras));
        assert_eq!(
            env.tracker.completed_track(student.id).unwrap(),
            Some(Track::Sciences)
        );
    }

    // ==========================================
    // 场景 D: 成绩越界与未分配教师
    // ==========================================
    #[test]
    fn test_evaluation_grade_and_assignment_checks() {
        let env = TestEnv::new();
        env.open_first_year();

        let (room_1, teachers_1) = env.staffed_classroom(1, Track::Sciences);
        let (_room_2, teachers_2) = env.staffed_classroom(2, Track::Sciences);
        let (student, _) = env.enrolled_student("Lucía Gómez", &room_1);

        let result = env
            .evaluations
            .create_evaluation(student.id, teachers_1[0].id, 6, OPERATOR);
        match result {
            Err(EngineError::Validation(fields)) => assert_eq!(fields[0].field, "grade"),
            other => panic!("unexpected: {:?}", other),
        }

        // 同学科但只在 2 号教室任教
        assert_eq!(teachers_2[0].subject, Subject::Math);
        assert_eq!(
            conflict_code(env.evaluations.create_evaluation(
                student.id,
                teachers_2[0].id,
                5,
                OPERATOR
            )),
            "TEACHER_NOT_ASSIGNED"
        );
        assert_eq!(env.count_rows("evaluation"), 0);

        let evaluation = env
            .evaluations
            .create_evaluation(student.id, teachers_1[0].id, 5, OPERATOR)
            .unwrap();
        assert_eq!(evaluation.subject, Subject::Math);
        assert_eq!(evaluation.grade, 5);
    }

    // ==========================================
    // 场景 E: 结业门槛
    // ==========================================
    #[test]
    fn test_close_course_year_requires_complete_evaluations() {
        let env = TestEnv::new();
        let cy = env.open_first_year();

        let (classroom, teachers) = env.staffed_classroom(1, Track::Sciences);
        let (complete, _) = env.enrolled_student("María López", &classroom);
        let (lagging, _) = env.enrolled_student("Jorge Ruiz", &classroom);

        env.set_now(at(2027, 6, 1));
        env.grade_all(&complete, &teachers, 4);
        let informatics = teachers
            .iter()
            .find(|t| t.subject == Subject::Informatics)
            .unwrap();
        for teacher in teachers.iter().filter(|t| t.subject != Subject::Informatics) {
            env.evaluations
                .create_evaluation(lagging.id, teacher.id, 3, OPERATOR)
                .unwrap();
        }

        match env.course_years.close_course_year(cy.id, OPERATOR) {
            Err(EngineError::Conflict(ConflictReason::IncompleteEvaluations(pending))) => {
                assert_eq!(pending.len(), 1);
                assert_eq!(pending[0].student_id, lagging.id);
                assert_eq!(pending[0].missing_subjects, vec![Subject::Informatics]);
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert!(env.course_years.get_course_year(cy.id).unwrap().active);

        env.evaluations
            .create_evaluation(lagging.id, informatics.id, 3, OPERATOR)
            .unwrap();
        let closed = env.course_years.close_course_year(cy.id, OPERATOR).unwrap();

        assert!(!closed.active);
        assert_eq!(closed.status(), CourseYearStatus::Closed);
        assert_eq!(closed.end_date, at(2027, 6, 1));
        assert!(env
            .evaluations
            .list_evaluations_for_student(lagging.id)
            .unwrap()
            .iter()
            .all(|e| !e.editable));
    }
}

// ==========================================
// CourseYearLifecycle 集成测试
// ==========================================
// 覆盖: 开启校验顺序、单一 active、结业、当前学年解析、排课沿用
// ==========================================


#[cfg(test)]
mod course_year_lifecycle_test {
    use academic_progression::domain::{CourseYearStatus, OperationType, Track};
    use academic_progression::engine::EngineError;

    use crate::test_helpers::{at, conflict_code, midnight, not_found_code, TestEnv, OPERATOR};

    #[test]
    fn test_open_course_year_becomes_current() {
        let env = TestEnv::new();
        assert!(env.course_years.get_current().unwrap().is_none());

        let cy = env.open_first_year();
        assert!(cy.active);
        assert_eq!(cy.status(), CourseYearStatus::Active);
        assert_eq!(cy.start_date, midnight(2026, 9, 1));
        assert_eq!(env.course_years.get_current().unwrap(), Some(cy));

        let audit = env.roster.recent_audit_entries(10).unwrap();
        assert!(audit
            .iter()
            .any(|e| e.operation == OperationType::OpenCourseYear.as_str()));
    }

    #[test]
    fn test_only_one_active_course_year() {
        let env = TestEnv::new();
        env.open_first_year();

        assert_eq!(
            conflict_code(env.course_years.open_course_year(
                "2027-2028",
                midnight(2027, 9, 1),
                midnight(2028, 7, 1),
                OPERATOR
            )),
            "ACTIVE_COURSE_YEAR_EXISTS"
        );
        assert_eq!(env.count_rows("course_year"), 1);
    }

    #[test]
    fn test_open_course_year_date_rules() {
        let env = TestEnv::new();
        env.set_now(at(2026, 8, 1));

        let open = |start, end| env.course_years.open_course_year("X", start, end, OPERATOR);

        assert_eq!(
            conflict_code(open(midnight(2026, 9, 1), midnight(2026, 9, 1))),
            "INVALID_DATE_RANGE"
        );
        assert_eq!(
            conflict_code(open(midnight(2026, 7, 1), midnight(2027, 7, 1))),
            "COURSE_YEAR_IN_PAST"
        );
        assert_eq!(
            conflict_code(open(midnight(2026, 9, 1), midnight(2028, 9, 2))),
            "COURSE_YEAR_TOO_LONG"
        );

        assert!(matches!(
            env.course_years
                .open_course_year("  ", midnight(2026, 9, 1), midnight(2027, 7, 1), OPERATOR),
            Err(EngineError::Validation(_))
        ));
        assert_eq!(env.count_rows("course_year"), 0);
    }

    #[test]
    fn test_open_course_year_rejects_overlap_including_touching_endpoints() {
        let env = TestEnv::new();
        env.seed_closed_year("futuro", midnight(2027, 9, 1), midnight(2028, 7, 1));

        assert_eq!(
            conflict_code(env.course_years.open_course_year(
                "A",
                midnight(2027, 6, 1),
                midnight(2027, 10, 1),
                OPERATOR
            )),
            "COURSE_YEAR_OVERLAP"
        );
        assert_eq!(
            conflict_code(env.course_years.open_course_year(
                "B",
                midnight(2028, 7, 1),
                midnight(2029, 6, 1),
                OPERATOR
            )),
            "COURSE_YEAR_OVERLAP"
        );

        env.course_years
            .open_course_year("C", midnight(2028, 7, 2), midnight(2029, 6, 1), OPERATOR)
            .unwrap();
    }

    #[test]
    fn test_close_course_year_errors() {
        let env = TestEnv::new();
        let cy = env.open_first_year();

        assert_eq!(
            not_found_code(env.course_years.close_course_year(999, OPERATOR)),
            "COURSE_YEAR_NOT_FOUND"
        );

        env.set_now(at(2026, 12, 1));
        let closed = env.course_years.close_course_year(cy.id, OPERATOR).unwrap();
        assert_eq!(closed.closed_at, Some(at(2026, 12, 1)));

        assert_eq!(
            conflict_code(env.course_years.close_course_year(cy.id, OPERATOR)),
            "COURSE_YEAR_ALREADY_CLOSED"
        );
    }

    #[test]
    fn test_current_falls_back_to_latest_closed_year() {
        let env = TestEnv::new();
        let first = env.open_first_year();
        env.set_now(at(2027, 7, 20));
        env.course_years.close_course_year(first.id, OPERATOR).unwrap();

        let current = env.course_years.get_current().unwrap().unwrap();
        assert_eq!(current.id, first.id);
        assert_eq!(current.status(), CourseYearStatus::Closed);

        // 只读解析可回退，写操作仍要求 active 学年
        let classroom = env.classroom(1, Track::Sciences);
        let student = env.admit("Ana Pérez");
        assert_eq!(
            conflict_code(env.enrollments.enroll(student.id, classroom.id, Track::Sciences, OPERATOR)),
            "NO_ACTIVE_COURSE_YEAR"
        );

        let second = env
            .course_years
            .open_course_year("2027-2028", midnight(2027, 8, 15), midnight(2028, 7, 15), OPERATOR)
            .unwrap();
        assert_eq!(env.course_years.get_current().unwrap().unwrap().id, second.id);

        let all = env.course_years.list_course_years().unwrap();
        assert_eq!(
            all.iter().map(|cy| cy.id).collect::<Vec<_>>(),
            vec![second.id, first.id]
        );
    }

    #[test]
    fn test_assignments_carry_over_to_new_course_year() {
        let env = TestEnv::new();
        let first = env.open_first_year();
        let (classroom, teachers) = env.staffed_classroom(1, Track::Sciences);
        let (student, _) = env.enrolled_student("Ana Pérez", &classroom);

        env.set_now(at(2027, 4, 1));
        env.grade_all(&student, &teachers, 4);
        let second = env.roll_to_second_year(&first);

        assert!(env
            .staffing
            .is_staffing_complete(classroom.id, Track::Sciences, second.id)
            .unwrap());
        assert_eq!(
            env.roster
                .list_classroom_assignments(classroom.id, second.id)
                .unwrap()
                .len(),
            3
        );
        assert!(env
            .roster
            .list_classroom_assignments(classroom.id, first.id)
            .unwrap()
            .is_empty());

        // 结业后的学年评分与注册保留
        assert_eq!(env.evaluations.list_evaluations_for_student(student.id).unwrap().len(), 3);
        assert_eq!(env.enrollments.list_enrollments_for_student(student.id).unwrap().len(), 1);
    }
}

use super::*;

#[test]
fn test_table_names_match_default_files() {
    for entity in Entity::ALL {
        assert_eq!(entity.default_file(), format!("{}.csv", entity.table_name()));
    }
    assert_eq!(Entity::Feedbacks.table_name(), "feedbacks");
}

#[test]
fn test_engagements_are_untyped() {
    assert!(Entity::Engagements.columns().is_none());
    assert!(Entity::Engagements
        .missing_columns::<&str>(&[])
        .is_empty());
}

#[test]
fn test_enrollment_schema() {
    let columns = Entity::Enrollments.columns().unwrap();
    let names: Vec<&str> = columns.iter().map(|c| c.name).collect();
    assert_eq!(
        names,
        vec![
            "enrollment_id",
            "participant_id",
            "course_id",
            "enrollment_date",
            "completion_date",
            "score",
            "status"
        ]
    );
    let date = columns.iter().find(|c| c.name == "enrollment_date").unwrap();
    assert_eq!(date.sql_type, SqlType::Date);
}

#[test]
fn test_missing_columns_reports_in_declaration_order() {
    let header = vec!["rating".to_string(), "extra".to_string()];
    assert_eq!(
        Entity::Feedbacks.missing_columns(&header),
        vec!["enrollment_id", "comments"]
    );
}

#[test]
fn test_missing_columns_ignores_extra_header_fields() {
    let header = [
        "participant_id",
        "first_name",
        "last_name",
        "department",
        "start_date_at_company",
        "email",
    ];
    assert!(Entity::Participants.missing_columns(&header).is_empty());
}

#[test]
fn test_entity_serde_lowercase() {
    let entity: Entity = serde_yaml::from_str("courses").unwrap();
    assert_eq!(entity, Entity::Courses);
    assert!(serde_yaml::from_str::<Entity>("Course").is_err());
}

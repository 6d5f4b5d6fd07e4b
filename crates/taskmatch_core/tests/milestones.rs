use rusqlite::Connection;
use taskmatch_core::db::open_db_in_memory;
use taskmatch_core::model::work::ProgressStatus;
use taskmatch_core::{
    AssignmentService, Candidate, DirectoryService, NewEmployee, PlanError, PlanService, Project,
    ProjectOverview, SqliteAssignmentStore, SqliteDirectoryRepository, SqlitePlanRepository,
    TaskPlan,
};

const PLAN_JSON: &str = r#"{"tasks": [{"category": "Data", "tasks": [{
    "task": "Storage",
    "subtasks": [
        {"name": "Design database schema"},
        {"name": "Optimize database queries"},
        {"name": "Write marketing copy"}
    ]
}]}]}"#;

struct Fixture {
    ada: Candidate,
    bob: Candidate,
}

fn setup(conn: &Connection) -> Fixture {
    let directory = DirectoryService::new(SqliteDirectoryRepository::try_new(conn).unwrap());
    directory
        .create_project(Project {
            project_id: 1,
            project_name: "Warehouse".to_string(),
            project_description: "Data platform".to_string(),
            deadline: Some("2027-01-15".to_string()),
        })
        .unwrap();
    let ada = directory
        .register_employee(NewEmployee {
            email: "ada@example.com".to_string(),
            skills: "database".to_string(),
            domains: "".to_string(),
        })
        .unwrap();
    directory.join_project(ada.id, 1).unwrap();
    let bob = directory
        .register_employee(NewEmployee {
            email: "bob@example.com".to_string(),
            skills: "sales".to_string(),
            domains: "marketing".to_string(),
        })
        .unwrap();

    let plan: TaskPlan = serde_json::from_str(PLAN_JSON).unwrap();
    PlanService::new(SqlitePlanRepository::try_new(conn).unwrap())
        .import_plan(1, &plan)
        .unwrap();

    Fixture { ada, bob }
}

fn overview(conn: &Connection) -> ProjectOverview {
    PlanService::new(SqlitePlanRepository::try_new(conn).unwrap())
        .project_overview(1)
        .unwrap()
}

fn log_rows(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM assignment_logs;", [], |row| row.get(0))
        .unwrap()
}

#[test]
fn finishing_all_milestones_closes_subtask_and_assigns_follow_up() {
    let conn = open_db_in_memory().unwrap();
    let fixture = setup(&conn);

    let report = AssignmentService::new(SqliteAssignmentStore::try_new(&conn).unwrap())
        .assign(1)
        .unwrap();
    // Pool is ada, bob (top-up). Bob scores on the marketing subtask.
    assert_eq!(report.assignments.len(), 2);

    let tree = overview(&conn);
    let schema = &tree.tasks[0].subtasks[0];
    let queries = &tree.tasks[0].subtasks[1];
    assert_eq!(schema.assignee, Some(fixture.ada.id));
    assert_eq!(queries.assignee, None);

    let service = PlanService::new(SqlitePlanRepository::try_new(&conn).unwrap());
    let milestone_ids: Vec<i64> = schema.milestones.iter().map(|m| m.id).collect();
    for milestone_id in &milestone_ids[..4] {
        let outcome = service
            .complete_milestone(fixture.ada.id, *milestone_id, "progress")
            .unwrap();
        assert!(!outcome.subtask_completed);
        assert_eq!(outcome.follow_up, None);
    }

    let outcome = service
        .complete_milestone(fixture.ada.id, milestone_ids[4], "finished schema")
        .unwrap();
    assert!(outcome.subtask_completed);
    assert_eq!(outcome.subtask_id, schema.id);
    let follow_up = outcome.follow_up.expect("database work should follow");
    assert_eq!(follow_up.id, queries.id);
    assert_eq!(log_rows(&conn), 5);

    let tree = overview(&conn);
    let schema = &tree.tasks[0].subtasks[0];
    assert_eq!(schema.status, ProgressStatus::Done);
    assert!(schema
        .milestones
        .iter()
        .all(|milestone| milestone.status == ProgressStatus::Done));
    assert_eq!(tree.tasks[0].subtasks[1].assignee, Some(fixture.ada.id));

    let status: String = conn
        .query_row(
            "SELECT status FROM assignments WHERE subtask_id = ?1;",
            [schema.id],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(status, "done");

    let progress = service.project_progress(1).unwrap();
    assert_eq!(progress.completed_subtasks, 1);
    assert_eq!(progress.remaining_subtasks, 2);
    assert_eq!(progress.available_subtasks, 0);
    assert_eq!(progress.employees_working, 2);
    assert_eq!(progress.employees_assigned, 2);
    assert_eq!(progress.free_employees, 0);
}

#[test]
fn no_follow_up_without_positive_score() {
    let conn = open_db_in_memory().unwrap();
    let fixture = setup(&conn);

    // Give the queries subtask to bob by hand so only marketing work stays open.
    let tree = overview(&conn);
    let schema = &tree.tasks[0].subtasks[0];
    let queries = &tree.tasks[0].subtasks[1];
    conn.execute(
        "INSERT INTO assignments (subtask_id, employee_id, status) VALUES (?1, ?2, 'open');",
        [schema.id, fixture.ada.id],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO assignments (subtask_id, employee_id, status) VALUES (?1, ?2, 'open');",
        [queries.id, fixture.bob.id],
    )
    .unwrap();

    let service = PlanService::new(SqlitePlanRepository::try_new(&conn).unwrap());
    let mut last = None;
    for milestone in &schema.milestones {
        last = Some(
            service
                .complete_milestone(fixture.ada.id, milestone.id, "done")
                .unwrap(),
        );
    }

    let outcome = last.unwrap();
    assert!(outcome.subtask_completed);
    assert_eq!(outcome.follow_up, None);
}

#[test]
fn milestone_errors_leave_state_untouched() {
    let conn = open_db_in_memory().unwrap();
    let fixture = setup(&conn);
    AssignmentService::new(SqliteAssignmentStore::try_new(&conn).unwrap())
        .assign(1)
        .unwrap();

    let tree = overview(&conn);
    let schema_milestone = tree.tasks[0].subtasks[0].milestones[0].id;
    let service = PlanService::new(SqlitePlanRepository::try_new(&conn).unwrap());

    assert!(matches!(
        service.complete_milestone(fixture.bob.id, schema_milestone, "not mine"),
        Err(PlanError::Conflict(_))
    ));
    assert!(matches!(
        service.complete_milestone(fixture.ada.id, 9_999, "missing"),
        Err(PlanError::NotFound { entity: "milestone", .. })
    ));
    assert!(matches!(
        service.complete_milestone(404, schema_milestone, "ghost"),
        Err(PlanError::NotFound { entity: "employee", .. })
    ));
    assert!(matches!(
        service.complete_milestone(fixture.ada.id, schema_milestone, "   "),
        Err(PlanError::InvalidInput(_))
    ));

    assert_eq!(log_rows(&conn), 0);
    let tree = overview(&conn);
    assert_eq!(
        tree.tasks[0].subtasks[0].milestones[0].status,
        ProgressStatus::Open
    );
}

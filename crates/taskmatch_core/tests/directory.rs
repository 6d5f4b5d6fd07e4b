use taskmatch_core::db::open_db_in_memory;
use taskmatch_core::{DirectoryError, DirectoryService, NewEmployee, Project, SqliteDirectoryRepository};

fn project(project_id: i64, name: &str) -> Project {
    Project {
        project_id,
        project_name: name.to_string(),
        project_description: "Build the thing".to_string(),
        deadline: Some("2026-12-31".to_string()),
    }
}

fn employee(email: &str, skills: &str, domains: &str) -> NewEmployee {
    NewEmployee {
        email: email.to_string(),
        skills: skills.to_string(),
        domains: domains.to_string(),
    }
}

#[test]
fn create_project_validates_and_rejects_duplicates() {
    let conn = open_db_in_memory().unwrap();
    let service = DirectoryService::new(SqliteDirectoryRepository::try_new(&conn).unwrap());

    let created = service.create_project(project(1, "  Apollo  ")).unwrap();
    assert_eq!(created.project_name, "Apollo");
    assert_eq!(service.get_project(1).unwrap(), created);

    assert!(matches!(
        service.create_project(project(1, "Apollo again")),
        Err(DirectoryError::Conflict(_))
    ));
    assert!(matches!(
        service.create_project(project(0, "Zero")),
        Err(DirectoryError::InvalidInput(_))
    ));
    assert!(matches!(
        service.create_project(project(2, "   ")),
        Err(DirectoryError::InvalidInput(_))
    ));
    assert!(matches!(
        service.get_project(9),
        Err(DirectoryError::NotFound { entity: "project", .. })
    ));
}

#[test]
fn register_employee_normalizes_email_and_enforces_uniqueness() {
    let conn = open_db_in_memory().unwrap();
    let service = DirectoryService::new(SqliteDirectoryRepository::try_new(&conn).unwrap());

    let first = service
        .register_employee(employee(" Ada@Example.com ", "rust,api", "backend"))
        .unwrap();
    assert_eq!(first.email, "ada@example.com");
    assert_eq!(first.skills, "rust,api");
    assert_eq!(service.employee_by_email("ADA@example.com").unwrap(), first);

    assert!(matches!(
        service.register_employee(employee("ada@example.com", "go", "")),
        Err(DirectoryError::Conflict(_))
    ));
    assert!(matches!(
        service.register_employee(employee("not-an-email", "go", "")),
        Err(DirectoryError::InvalidInput(_))
    ));
}

#[test]
fn add_skills_appends_to_existing_text() {
    let conn = open_db_in_memory().unwrap();
    let service = DirectoryService::new(SqliteDirectoryRepository::try_new(&conn).unwrap());
    service
        .register_employee(employee("grace@example.com", "cobol", "compilers"))
        .unwrap();
    service
        .register_employee(employee("linus@example.com", "", "kernels"))
        .unwrap();

    let grace = service.add_skills("grace@example.com", "rust, api").unwrap();
    assert_eq!(grace.skills, "cobol,rust, api");

    let linus = service.add_skills("linus@example.com", "git").unwrap();
    assert_eq!(linus.skills, "git");

    assert!(matches!(
        service.add_skills("nobody@example.com", "git"),
        Err(DirectoryError::NotFound { entity: "employee", .. })
    ));
    assert!(matches!(
        service.add_skills("grace@example.com", "  "),
        Err(DirectoryError::InvalidInput(_))
    ));
}

#[test]
fn join_project_is_idempotent_and_checks_references() {
    let conn = open_db_in_memory().unwrap();
    let service = DirectoryService::new(SqliteDirectoryRepository::try_new(&conn).unwrap());
    service.create_project(project(1, "Apollo")).unwrap();
    let ada = service
        .register_employee(employee("ada@example.com", "rust", ""))
        .unwrap();
    let bob = service
        .register_employee(employee("bob@example.com", "go", ""))
        .unwrap();

    assert!(service.join_project(ada.id, 1).unwrap());
    assert!(!service.join_project(ada.id, 1).unwrap());

    let members = service.project_members(1).unwrap();
    assert_eq!(members, vec![ada.clone()]);
    assert_eq!(service.unaffiliated_employees().unwrap(), vec![bob]);

    assert!(matches!(
        service.join_project(ada.id, 5),
        Err(DirectoryError::NotFound { entity: "project", .. })
    ));
    assert!(matches!(
        service.join_project(999, 1),
        Err(DirectoryError::NotFound { entity: "employee", .. })
    ));
}

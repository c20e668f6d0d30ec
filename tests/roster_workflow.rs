use calamine::{open_workbook, Data, Reader, Xlsx};
use student_roster::{open_database, Draft, RecordService, RosterError, Session};

fn draft(id: &str, first: &str, last: &str, email: &str, mark: &str) -> Draft {
    Draft {
        id: id.to_string(),
        first_name: first.to_string(),
        last_name: last.to_string(),
        email: email.to_string(),
        mark: mark.to_string(),
    }
}

#[test]
fn duplicate_insert_leaves_single_record() {
    let dir = tempfile::tempdir().unwrap();
    let service = RecordService::new(open_database(&dir.path().join("students.sqlite")).unwrap());
    let mut session = Session::new();

    session.draft = draft("1", "Ann", "Lee", "ann@x.com", "90");
    service.create(&mut session).unwrap();

    session.draft = draft("1", "Ann", "Lee", "ann@x.com", "90");
    let err = service.create(&mut session).unwrap_err();

    assert!(matches!(err, RosterError::DuplicateKey { .. }));
    assert_eq!(service.list_all().unwrap().len(), 1);
}

#[test]
fn changes_survive_reopening_the_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("students.sqlite");

    {
        let service = RecordService::new(open_database(&path).unwrap());
        let mut session = Session::new();
        session.draft = draft("1", "Ann", "Lee", "ann@x.com", "90");
        let ann = service.create(&mut session).unwrap();
        session.draft = draft("2", "Bob", "Ray", "bob@x.com", "60");
        service.create(&mut session).unwrap();

        service.begin_edit(&mut session, Some(&ann)).unwrap();
        session.draft.id = "10".to_string();
        session.draft.last_name = "D'Arcy".to_string();
        service.commit_edit(&mut session).unwrap();
    }

    let service = RecordService::new(open_database(&path).unwrap());
    let all = service.list_all().unwrap();
    let ids: Vec<_> = all.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, ["10", "2"]);
    assert_eq!(all[0].last_name, "D'Arcy");
}

#[test]
fn export_matches_listing_order() {
    let dir = tempfile::tempdir().unwrap();
    let service = RecordService::new(open_database(&dir.path().join("students.sqlite")).unwrap());
    let mut session = Session::new();
    for (id, first) in [("30", "Cat"), ("4", "Dan"), ("17", "Eve")] {
        session.draft = draft(id, first, "Lee", &format!("{}@x.com", first.to_lowercase()), "80");
        service.create(&mut session).unwrap();
    }

    let export_path = dir.path().join("exports").join("students.xlsx");
    let summary = service.export(export_path.clone()).unwrap().wait().unwrap();
    assert_eq!(summary.rows, 3);

    let mut workbook: Xlsx<_> = open_workbook(&export_path).unwrap();
    let range = workbook.worksheet_range("Students").unwrap();
    let rows: Vec<Vec<String>> = range
        .rows()
        .map(|row| {
            row.iter()
                .map(|cell| match cell {
                    Data::String(text) => text.clone(),
                    other => other.to_string(),
                })
                .collect()
        })
        .collect();

    assert_eq!(rows.len(), 4);
    let listed: Vec<Vec<String>> = service
        .list_all()
        .unwrap()
        .into_iter()
        .map(|s| vec![s.id, s.first_name, s.last_name, s.email, s.mark])
        .collect();
    assert_eq!(&rows[1..], listed.as_slice());
}

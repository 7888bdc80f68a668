use booktracker_core::db::{open_db, open_db_in_memory};
use booktracker_core::{
    BookInput, BookService, BookServiceError, BookSource, ErrorKind, NormalizationPolicy,
    ReadStatus, SourceError, SourceIdentifier, SourceRecord, SqliteBookRepository,
};
use rusqlite::{params, Connection};
use std::sync::{Arc, Barrier};
use std::thread;

fn author_count(conn: &Connection, last: &str, first: &str) -> i64 {
    conn.query_row(
        "SELECT COUNT(*) FROM authors WHERE author_last = ?1 AND author_first = ?2;",
        params![last, first],
        |row| row.get(0),
    )
    .unwrap()
}

fn total_authors(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM authors;", [], |row| row.get(0))
        .unwrap()
}

fn dune() -> BookInput {
    let mut input = BookInput::new("Dune", "herbert", "frank");
    input.details.year = Some(1965);
    input
}

#[test]
fn create_then_read_returns_normalized_input() {
    let conn = open_db_in_memory().unwrap();
    let service = BookService::new(SqliteBookRepository::try_new(&conn).unwrap());

    let mut input = BookInput::new("  The Left Hand of Darkness ", " le guin", "URSULA");
    input.details.series = Some(" Hainish Cycle ".to_string());
    input.details.volume = Some(4);
    input.details.year = Some(1969);
    input.details.language = Some("english".to_string());
    input.details.genre = Some("science fiction".to_string());
    input.details.written_form = Some("Novel".to_string());
    input.details.publisher = Some(" Ace Books".to_string());
    input.details.collection = Some("Ace SF Specials".to_string());
    input.details.isbn = Some(9_780_441_478_125);

    let id = service.create(&input).unwrap();
    let book = service.read(id).unwrap();

    assert_eq!(book.id, id);
    let expected = input.normalized(NormalizationPolicy::default());
    assert_eq!(book.title, expected.title);
    assert_eq!(book.author.last_name, expected.author_last);
    assert_eq!(book.author.first_name, expected.author_first);
    assert_eq!(book.details, expected.details);
    assert_eq!(book.author.last_name, "Le guin");
    assert_eq!(book.details.language.as_deref(), Some("English"));
    assert_eq!(book.details.publisher.as_deref(), Some("Ace Books"));
    assert_eq!(book.status, None);
}

#[test]
fn dune_scenario_create_list_delete_removes_orphaned_author() {
    let conn = open_db_in_memory().unwrap();
    let service = BookService::new(SqliteBookRepository::try_new(&conn).unwrap());

    let id = service.create(&dune()).unwrap();
    let book = service.read(id).unwrap();
    assert_eq!(book.author.last_name, "Herbert");
    assert_eq!(book.author.first_name, "Frank");
    assert!(service.list().unwrap().iter().any(|book| book.id == id));

    service.delete(id).unwrap();

    assert!(matches!(service.read(id), Err(BookServiceError::NotFound(found)) if found == id));
    assert_eq!(author_count(&conn, "Herbert", "Frank"), 0);
}

#[test]
fn shared_author_survives_until_last_book_is_deleted() {
    let conn = open_db_in_memory().unwrap();
    let service = BookService::new(SqliteBookRepository::try_new(&conn).unwrap());

    let first = service.create(&dune()).unwrap();
    let second = service
        .create(&BookInput::new("Dune Messiah", "Herbert", "Frank"))
        .unwrap();
    assert_eq!(author_count(&conn, "Herbert", "Frank"), 1);
    let author_id = service.read(first).unwrap().author.id;

    service.delete(first).unwrap();
    assert_eq!(author_count(&conn, "Herbert", "Frank"), 1);
    assert_eq!(service.read(second).unwrap().author.id, author_id);

    service.delete(second).unwrap();
    assert_eq!(author_count(&conn, "Herbert", "Frank"), 0);
}

#[test]
fn update_to_new_author_releases_old_sole_author() {
    let conn = open_db_in_memory().unwrap();
    let service = BookService::new(SqliteBookRepository::try_new(&conn).unwrap());
    let id = service
        .create(&BookInput::new("Dune", "Herbrt", "Frank"))
        .unwrap();

    service.update(id, &dune()).unwrap();

    assert_eq!(author_count(&conn, "Herbrt", "Frank"), 0);
    assert_eq!(author_count(&conn, "Herbert", "Frank"), 1);
    let book = service.read(id).unwrap();
    assert_eq!(book.author.last_name, "Herbert");
    assert_eq!(book.details.year, Some(1965));
}

#[test]
fn update_to_existing_author_reuses_row() {
    let conn = open_db_in_memory().unwrap();
    let service = BookService::new(SqliteBookRepository::try_new(&conn).unwrap());
    let asimov = service
        .create(&BookInput::new("Foundation", "Asimov", "Isaac"))
        .unwrap();
    let misfiled = service
        .create(&BookInput::new("I, Robot", "Herbert", "Frank"))
        .unwrap();
    let asimov_id = service.read(asimov).unwrap().author.id;

    service
        .update(misfiled, &BookInput::new("I, Robot", "asimov", "isaac"))
        .unwrap();

    assert_eq!(service.read(misfiled).unwrap().author.id, asimov_id);
    assert_eq!(author_count(&conn, "Herbert", "Frank"), 0);
    assert_eq!(total_authors(&conn), 1);
}

#[test]
fn update_keeping_same_author_leaves_exactly_one_row() {
    let conn = open_db_in_memory().unwrap();
    let service = BookService::new(SqliteBookRepository::try_new(&conn).unwrap());
    let id = service.create(&dune()).unwrap();

    let mut edited = dune();
    edited.title = "Dune (40th anniversary)".to_string();
    edited.details.year = Some(2005);
    service.update(id, &edited).unwrap();

    assert_eq!(author_count(&conn, "Herbert", "Frank"), 1);
    assert_eq!(total_authors(&conn), 1);
    let book = service.read(id).unwrap();
    assert_eq!(book.title, "Dune (40th anniversary)");
    assert_eq!(book.details.year, Some(2005));
}

#[test]
fn update_missing_book_is_not_found_and_leaves_catalog_untouched() {
    let conn = open_db_in_memory().unwrap();
    let service = BookService::new(SqliteBookRepository::try_new(&conn).unwrap());
    service.create(&dune()).unwrap();

    let err = service
        .update(999, &BookInput::new("Ghost", "Nobody", ""))
        .unwrap_err();

    assert!(matches!(err, BookServiceError::NotFound(999)));
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(author_count(&conn, "Nobody", ""), 0);
    assert_eq!(total_authors(&conn), 1);
}

#[test]
fn delete_missing_book_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let service = BookService::new(SqliteBookRepository::try_new(&conn).unwrap());

    assert!(matches!(
        service.delete(3),
        Err(BookServiceError::NotFound(3))
    ));
}

#[test]
fn invalid_input_is_rejected_before_storage() {
    let conn = open_db_in_memory().unwrap();
    let service = BookService::new(SqliteBookRepository::try_new(&conn).unwrap());

    let mut input = BookInput::new("   ", "", "Frank");
    input.details.year = Some(2200);

    match service.create(&input).unwrap_err() {
        BookServiceError::Validation(err) => {
            assert!(err.mentions("title"));
            assert!(err.mentions("author_last"));
            assert!(err.mentions("year"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(total_authors(&conn), 0);

    let id = service.create(&dune()).unwrap();
    let err = service
        .update(id, &BookInput::new("Dune", " ", ""))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(service.read(id).unwrap().author.last_name, "Herbert");
}

#[test]
fn set_status_twice_keeps_single_row_with_latest_value() {
    let conn = open_db_in_memory().unwrap();
    let service = BookService::new(SqliteBookRepository::try_new(&conn).unwrap());
    let id = service.create(&dune()).unwrap();

    service.set_status(id, "read").unwrap();
    service.set_status(id, "not_read").unwrap();

    let rows: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM read_status WHERE book_id = ?1;",
            [id],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(rows, 1);
    assert_eq!(service.read(id).unwrap().status, Some(ReadStatus::NotRead));
}

#[test]
fn set_status_rejects_unknown_values_and_missing_books() {
    let conn = open_db_in_memory().unwrap();
    let service = BookService::new(SqliteBookRepository::try_new(&conn).unwrap());
    let id = service.create(&dune()).unwrap();

    let invalid = service.set_status(id, "half_read").unwrap_err();
    assert_eq!(invalid.kind(), ErrorKind::Validation);
    assert!(invalid.to_string().contains("status"));

    let missing = service.set_status(id + 1, "read").unwrap_err();
    assert!(matches!(missing, BookServiceError::NotFound(found) if found == id + 1));
}

#[test]
fn deleting_book_removes_its_status() {
    let conn = open_db_in_memory().unwrap();
    let service = BookService::new(SqliteBookRepository::try_new(&conn).unwrap());
    let id = service.create(&dune()).unwrap();
    service.set_read_status(id, ReadStatus::Read).unwrap();

    service.delete(id).unwrap();

    let rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM read_status;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 0);
}

#[test]
fn list_sorts_by_author_and_year_with_null_years_last() {
    let conn = open_db_in_memory().unwrap();
    let service = BookService::new(SqliteBookRepository::try_new(&conn).unwrap());

    let mut children = BookInput::new("Children of Dune", "Herbert", "Frank");
    children.details.year = Some(1976);
    let undated = BookInput::new("The Godmakers", "Herbert", "Frank");
    let mut earthsea = BookInput::new("A Wizard of Earthsea", "Le guin", "Ursula");
    earthsea.details.year = Some(1968);

    for input in [&undated, &earthsea, &children, &dune()] {
        service.create(input).unwrap();
    }

    let titles: Vec<String> = service
        .list()
        .unwrap()
        .into_iter()
        .map(|book| book.title)
        .collect();
    assert_eq!(
        titles,
        vec![
            "Dune",
            "Children of Dune",
            "The Godmakers",
            "A Wizard of Earthsea"
        ]
    );
}

#[test]
fn trim_only_policy_keeps_author_case() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteBookRepository::try_new(&conn).unwrap();
    let service = BookService::with_policy(repo, NormalizationPolicy::trim_only());

    let id = service
        .create(&BookInput::new("Slan", " van Vogt ", "A. E."))
        .unwrap();

    let book = service.read(id).unwrap();
    assert_eq!(book.author.last_name, "van Vogt");
    assert_eq!(book.author.display_name(), "van Vogt, A. E.");
}

#[test]
fn stats_count_status_buckets() {
    let conn = open_db_in_memory().unwrap();
    let service = BookService::new(SqliteBookRepository::try_new(&conn).unwrap());
    let first = service.create(&dune()).unwrap();
    let second = service
        .create(&BookInput::new("Foundation", "Asimov", "Isaac"))
        .unwrap();
    service
        .create(&BookInput::new("I, Robot", "Asimov", "Isaac"))
        .unwrap();
    service.set_status(first, "read").unwrap();
    service.set_status(second, "not_read").unwrap();

    let stats = service.stats().unwrap();
    assert_eq!(stats.books, 3);
    assert_eq!(stats.authors, 2);
    assert_eq!(stats.read, 1);
    assert_eq!(stats.not_read, 1);
    assert_eq!(stats.unknown, 1);
}

struct FixtureSource {
    record: Option<SourceRecord>,
    fail: bool,
}

impl BookSource for FixtureSource {
    fn lookup_isbn(&self, _isbn: i64) -> Result<Option<SourceRecord>, SourceError> {
        if self.fail {
            return Err(SourceError::Unavailable("connection refused".to_string()));
        }
        Ok(self.record.clone())
    }
}

#[test]
fn create_from_source_goes_through_normal_create_path() {
    let conn = open_db_in_memory().unwrap();
    let service = BookService::new(SqliteBookRepository::try_new(&conn).unwrap());
    let source = FixtureSource {
        record: Some(SourceRecord {
            title: "Dune".to_string(),
            authors: vec!["frank herbert".to_string()],
            published_date: Some("1965-08".to_string()),
            language: Some("en".to_string()),
            publisher: Some("Chilton Books".to_string()),
            industry_identifiers: vec![SourceIdentifier {
                kind: "ISBN_13".to_string(),
                identifier: "978-0-441-01359-3".to_string(),
            }],
        }),
        fail: false,
    };

    let id = service.create_from_source(&source, 441_013_597).unwrap();

    let book = service.read(id).unwrap();
    assert_eq!(book.author.display_name(), "Herbert, Frank");
    assert_eq!(book.details.year, Some(1965));
    assert_eq!(book.details.language.as_deref(), Some("En"));
    assert_eq!(book.details.isbn, Some(9_780_441_013_593));
}

#[test]
fn create_from_source_reports_missing_and_failing_lookups() {
    let conn = open_db_in_memory().unwrap();
    let service = BookService::new(SqliteBookRepository::try_new(&conn).unwrap());

    let empty = FixtureSource {
        record: None,
        fail: false,
    };
    let missing = service.create_from_source(&empty, 123).unwrap_err();
    assert!(matches!(missing, BookServiceError::SourceNotFound { isbn: 123 }));
    assert_eq!(missing.kind(), ErrorKind::NotFound);

    let broken = FixtureSource {
        record: None,
        fail: true,
    };
    let failed = service.create_from_source(&broken, 123).unwrap_err();
    assert_eq!(failed.kind(), ErrorKind::Source);
    assert!(service.list().unwrap().is_empty());
}

#[test]
fn lookup_from_source_normalizes_without_saving() {
    let conn = open_db_in_memory().unwrap();
    let service = BookService::new(SqliteBookRepository::try_new(&conn).unwrap());
    let source = FixtureSource {
        record: Some(SourceRecord {
            title: " Neuromancer ".to_string(),
            authors: vec!["william GIBSON".to_string()],
            published_date: Some("1984".to_string()),
            ..SourceRecord::default()
        }),
        fail: false,
    };

    let input = service.lookup_from_source(&source, 441_569_595).unwrap();

    assert_eq!(input.title, "Neuromancer");
    assert_eq!(input.author_last, "Gibson");
    assert_eq!(input.author_first, "William");
    assert_eq!(input.details.year, Some(1984));
    assert_eq!(input.details.isbn, Some(441_569_595));
    assert!(service.list().unwrap().is_empty());
    assert_eq!(total_authors(&conn), 0);
}

#[test]
fn concurrent_writers_share_one_new_author_row() {
    const BOOKS_PER_WRITER: usize = 5;

    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("catalog.sqlite3");
    drop(open_db(&path).unwrap());

    let barrier = Arc::new(Barrier::new(2));
    let writers: Vec<_> = ["Guards! Guards!", "Small Gods"]
        .into_iter()
        .map(|series| {
            let path = path.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let conn = open_db(&path).unwrap();
                let service = BookService::new(SqliteBookRepository::try_new(&conn).unwrap());
                barrier.wait();
                (0..BOOKS_PER_WRITER)
                    .map(|idx| {
                        let title = format!("{series} {idx}");
                        service
                            .create(&BookInput::new(title, "Pratchett", "Terry"))
                            .unwrap()
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();
    let created: Vec<i64> = writers
        .into_iter()
        .flat_map(|writer| writer.join().unwrap())
        .collect();

    let conn = open_db(&path).unwrap();
    let service = BookService::new(SqliteBookRepository::try_new(&conn).unwrap());
    assert_eq!(created.len(), 2 * BOOKS_PER_WRITER);
    assert_eq!(author_count(&conn, "Pratchett", "Terry"), 1);
    assert_eq!(total_authors(&conn), 1);

    let books = service.list().unwrap();
    assert_eq!(books.len(), 2 * BOOKS_PER_WRITER);
    let author_id = books[0].author.id;
    assert!(books.iter().all(|book| book.author.id == author_id));
}

#![forbid(unsafe_code)]

use std::str::FromStr;

use log::{debug, info};
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqliteJournalMode, SqliteRow};
use sqlx::{Connection, Row as _, Sqlite, SqliteConnection};

use crate::orm::descriptor::{Descriptor, SqlType};
use crate::orm::record::{Entity, Row, Value};
use crate::orm::statements::{create_table_sql, insert_sql, select_all_sql, select_by_id_sql,
                             SELECT_TABLES};
use crate::utils::errors::Errors;

// Database constants.
pub const IN_MEMORY: &str = ":memory:";
const SQLITE_MEMORY_URL: &str = "sqlite::memory:";

// ***************************************************************************
//                               Database
// ***************************************************************************
/** An open connection to one sqlite database.  Every mapping operation is
 * issued through a handle, so two handles opened on different files never
 * share state.  Statements run one at a time on the single connection and
 * no transactions are used.
 */
#[derive(Debug)]
pub struct Database {
    name: String,
    conn: SqliteConnection,
}

impl Database {
    // ---------------------------------------------------------------------------
    // open:
    // ---------------------------------------------------------------------------
    /** Open the named database file, creating it if it doesn't exist.  The
     * name ":memory:" opens a private in-memory database.
     */
    pub async fn open(name: &str) -> Result<Database, Errors> {
        let options = if name == IN_MEMORY {
            SqliteConnectOptions::from_str(SQLITE_MEMORY_URL)?
        } else {
            SqliteConnectOptions::new()
                .filename(name)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
        };

        let conn = SqliteConnection::connect_with(&options).await?;
        info!("Opened database {}", name);
        Ok(Database { name: name.to_string(), conn })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // ---------------------------------------------------------------------------
    // close:
    // ---------------------------------------------------------------------------
    pub async fn close(self) -> Result<(), Errors> {
        self.conn.close().await?;
        Ok(())
    }

    // ---------------------------------------------------------------------------
    // tables:
    // ---------------------------------------------------------------------------
    /** The names of the user tables in this database, sorted. */
    pub async fn tables(&mut self) -> Result<Vec<String>, Errors> {
        let rows = sqlx::query(SELECT_TABLES)
            .fetch_all(&mut self.conn)
            .await?;

        rows.iter()
            .map(|r| r.try_get::<String, _>(0).map_err(Errors::from))
            .collect()
    }

    // ---------------------------------------------------------------------------
    // create_table:
    // ---------------------------------------------------------------------------
    pub async fn create_table(&mut self, d: &Descriptor) -> Result<(), Errors> {
        let sql = create_table_sql(d);
        debug!("{}", sql);
        sqlx::query(&sql)
            .execute(&mut self.conn)
            .await?;

        info!("Created table {} in database {}.", d.name(), self.name);
        Ok(())
    }

    // ---------------------------------------------------------------------------
    // save:
    // ---------------------------------------------------------------------------
    /** Insert the entity as a new row and assign it the row id chosen by the
     * database.  The entity is only modified if the insert succeeds.
     */
    pub async fn save<E: Entity>(&mut self, entity: &mut E) -> Result<i64, Errors> {
        let id = self.insert_row(E::descriptor(), &entity.to_row()).await?;
        entity.set_id(id);
        Ok(id)
    }

    // ---------------------------------------------------------------------------
    // all_rows:
    // ---------------------------------------------------------------------------
    /** Every row of the entity's table, in id order. */
    pub async fn all_rows<E: Entity>(&mut self) -> Result<Vec<E>, Errors> {
        self.select_all(E::descriptor()).await?
            .into_iter()
            .map(E::from_row)
            .collect()
    }

    // ---------------------------------------------------------------------------
    // get_by_id:
    // ---------------------------------------------------------------------------
    pub async fn get_by_id<E: Entity>(&mut self, id: i64) -> Result<E, Errors> {
        E::from_row(self.select_by_id(E::descriptor(), id).await?)
    }

    // ***************************************************************************
    //                          Untyped Row Operations
    // ***************************************************************************
    // ---------------------------------------------------------------------------
    // insert_row:
    // ---------------------------------------------------------------------------
    /** Insert the row's values in descriptor column order and return the new
     * row id.  Any id already present in the row is ignored.
     */
    pub async fn insert_row(&mut self, d: &Descriptor, row: &Row) -> Result<i64, Errors> {
        let sql = insert_sql(d);
        debug!("{}", sql);

        let mut query = sqlx::query(&sql);
        for value in row.values_for(d) {
            query = bind_value(query, value);
        }
        let result = query
            .execute(&mut self.conn)
            .await?;

        Ok(result.last_insert_rowid())
    }

    // ---------------------------------------------------------------------------
    // select_all:
    // ---------------------------------------------------------------------------
    pub async fn select_all(&mut self, d: &Descriptor) -> Result<Vec<Row>, Errors> {
        let sql = select_all_sql(d);
        debug!("{}", sql);

        let rows = sqlx::query(&sql)
            .fetch_all(&mut self.conn)
            .await?;

        rows.iter().map(|r| decode_row(d, r)).collect()
    }

    // ---------------------------------------------------------------------------
    // select_by_id:
    // ---------------------------------------------------------------------------
    pub async fn select_by_id(&mut self, d: &Descriptor, id: i64) -> Result<Row, Errors> {
        let sql = select_by_id_sql(d);
        debug!("{} [{}]", sql, id);

        let result = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&mut self.conn)
            .await?;

        match result {
            Some(r) => decode_row(d, &r),
            None => Err(Errors::RowNotFound { table: d.name().to_string(), id }),
        }
    }
}

// ***************************************************************************
//                          Private Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// bind_value:
// ---------------------------------------------------------------------------
fn bind_value<'q>(query: Query<'q, Sqlite, SqliteArguments<'q>>, value: Value)
    -> Query<'q, Sqlite, SqliteArguments<'q>>
{
    match value {
        Value::Null       => query.bind(None::<i64>),
        Value::Integer(v) => query.bind(v),
        Value::Real(v)    => query.bind(v),
        Value::Text(v)    => query.bind(v),
        Value::Blob(v)    => query.bind(v),
        Value::Bool(v)    => query.bind(v),
    }
}

// ---------------------------------------------------------------------------
// decode_row:
// ---------------------------------------------------------------------------
/** Read the id and each column of a selected row using the storage type
 * declared in the descriptor.
 */
fn decode_row(d: &Descriptor, r: &SqliteRow) -> Result<Row, Errors> {
    let names = d.select_names();
    let mut values = Vec::with_capacity(names.len());
    values.push(Value::from(r.try_get::<Option<i64>, _>(0)?));

    for (i, sql_type) in d.column_types().iter().enumerate() {
        let idx = i + 1;
        let value = match sql_type {
            SqlType::Integer => Value::from(r.try_get::<Option<i64>, _>(idx)?),
            SqlType::Real    => Value::from(r.try_get::<Option<f64>, _>(idx)?),
            SqlType::Text    => Value::from(r.try_get::<Option<String>, _>(idx)?),
            SqlType::Blob    => Value::from(r.try_get::<Option<Vec<u8>>, _>(idx)?),
            SqlType::Bool    => Value::from(r.try_get::<Option<bool>, _>(idx)?),
        };
        values.push(value);
    }

    Row::from_columns(&names, values)
}

// ***************************************************************************
//                                  Tests
// ***************************************************************************
#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use lazy_static::lazy_static;

    use super::*;

    lazy_static! {
        static ref AUTHOR: Descriptor = Descriptor::builder("author")
            .column("name", SqlType::Text)
            .column("born", SqlType::Integer)
            .build()
            .unwrap();

        static ref POST: Descriptor = Descriptor::builder("post")
            .column("title", SqlType::Text)
            .column("rating", SqlType::Real)
            .column("published", SqlType::Bool)
            .column("cover", SqlType::Blob)
            .foreign_key("author", "author")
            .build()
            .unwrap();
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Author {
        id: Option<i64>,
        name: String,
        born: i64,
    }

    impl Author {
        fn new(name: &str, born: i64) -> Self {
            Author { id: None, name: name.to_string(), born }
        }
    }

    impl Entity for Author {
        fn descriptor() -> &'static Descriptor { &AUTHOR }
        fn id(&self) -> Option<i64> { self.id }
        fn set_id(&mut self, id: i64) { self.id = Some(id); }

        fn to_row(&self) -> Row {
            Row::with_id(self.id)
                .with("name", self.name.as_str())
                .with("born", self.born)
        }

        fn from_row(mut row: Row) -> Result<Self, Errors> {
            Ok(Author { id: row.id, name: row.take("name")?, born: row.take("born")? })
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Post {
        id: Option<i64>,
        title: String,
        rating: f64,
        published: bool,
        cover: Option<Vec<u8>>,
        author_id: Option<i64>,
    }

    impl Entity for Post {
        fn descriptor() -> &'static Descriptor { &POST }
        fn id(&self) -> Option<i64> { self.id }
        fn set_id(&mut self, id: i64) { self.id = Some(id); }

        fn to_row(&self) -> Row {
            Row::with_id(self.id)
                .with("title", self.title.as_str())
                .with("rating", self.rating)
                .with("published", self.published)
                .with("cover", self.cover.clone())
                .with("author_id", self.author_id)
        }

        fn from_row(mut row: Row) -> Result<Self, Errors> {
            Ok(Post {
                id: row.id,
                title: row.take("title")?,
                rating: row.take("rating")?,
                published: row.take("published")?,
                cover: row.take("cover")?,
                author_id: row.take("author_id")?,
            })
        }
    }

    async fn memory_db() -> Database {
        let mut db = Database::open(IN_MEMORY).await.unwrap();
        db.create_table(&AUTHOR).await.unwrap();
        db.create_table(&POST).await.unwrap();
        db
    }

    #[tokio::test]
    async fn save_then_get_by_id() {
        let mut db = memory_db().await;

        let mut author = Author::new("Ursula", 1929);
        assert_eq!(author.id(), None);
        let author_id = db.save(&mut author).await.unwrap();
        assert_eq!(author.id(), Some(author_id));

        let mut post = Post {
            id: None,
            title: "The Dispossessed".to_string(),
            rating: 4.5,
            published: true,
            cover: Some(vec![0x89, 0x50, 0x4e, 0x47]),
            author_id: Some(author_id),
        };
        let post_id = db.save(&mut post).await.unwrap();

        let loaded: Post = db.get_by_id(post_id).await.unwrap();
        assert_eq!(loaded, post);
        let loaded: Author = db.get_by_id(author_id).await.unwrap();
        assert_eq!(loaded, author);
    }

    #[tokio::test]
    async fn nulls_round_trip() {
        let mut db = memory_db().await;
        let mut post = Post {
            id: None,
            title: "Draft".to_string(),
            rating: 0.0,
            published: false,
            cover: None,
            author_id: None,
        };
        let id = db.save(&mut post).await.unwrap();
        let loaded: Post = db.get_by_id(id).await.unwrap();
        assert_eq!(loaded.cover, None);
        assert_eq!(loaded.author_id, None);
        assert!(!loaded.published);
    }

    #[tokio::test]
    async fn all_rows_returns_every_save() {
        let mut db = memory_db().await;
        for (name, born) in [("Ada", 1815), ("Grace", 1906), ("Alan", 1912)] {
            db.save(&mut Author::new(name, born)).await.unwrap();
        }

        let authors: Vec<Author> = db.all_rows().await.unwrap();
        assert_eq!(authors.len(), 3);
        let ids: HashSet<i64> = authors.iter().map(|a| a.id.unwrap()).collect();
        assert_eq!(ids.len(), 3);
        assert_eq!(authors[1].name, "Grace");
    }

    #[tokio::test]
    async fn all_rows_on_empty_table() {
        let mut db = memory_db().await;
        let posts: Vec<Post> = db.all_rows().await.unwrap();
        assert!(posts.is_empty());
    }

    #[tokio::test]
    async fn missing_row_is_not_found() {
        let mut db = memory_db().await;
        let err = db.get_by_id::<Author>(42).await.unwrap_err();
        match err {
            Errors::RowNotFound { table, id } => {
                assert_eq!(table, "author");
                assert_eq!(id, 42);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn values_are_bound_not_interpolated() {
        let mut db = memory_db().await;
        let mut author = Author::new("x'); DROP TABLE author; --", 1);
        let id = db.save(&mut author).await.unwrap();
        let loaded: Author = db.get_by_id(id).await.unwrap();
        assert_eq!(loaded.name, author.name);
        assert_eq!(db.tables().await.unwrap(), vec!["author", "post"]);
    }

    #[tokio::test]
    async fn create_twice_is_a_database_error() {
        let mut db = memory_db().await;
        let err = db.create_table(&AUTHOR).await.unwrap_err();
        assert!(matches!(err, Errors::DatabaseError(_)));
    }

    #[tokio::test]
    async fn table_without_columns() {
        let d = Descriptor::builder("marker").build().unwrap();
        let mut db = Database::open(IN_MEMORY).await.unwrap();
        db.create_table(&d).await.unwrap();
        let first = db.insert_row(&d, &Row::new()).await.unwrap();
        let second = db.insert_row(&d, &Row::new()).await.unwrap();
        assert_ne!(first, second);
        assert_eq!(db.select_all(&d).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn separate_files_are_separate_databases() {
        let dir = std::env::temp_dir();
        let pid = std::process::id();
        let first = dir.join(format!("mini_web_first_{}.db", pid));
        let second = dir.join(format!("mini_web_second_{}.db", pid));
        for p in [&first, &second] {
            let _ = std::fs::remove_file(p);
        }

        let mut db1 = Database::open(first.to_str().unwrap()).await.unwrap();
        let mut db2 = Database::open(second.to_str().unwrap()).await.unwrap();
        db1.create_table(&AUTHOR).await.unwrap();

        assert_eq!(db1.tables().await.unwrap(), vec!["author"]);
        assert!(db2.tables().await.unwrap().is_empty());
        assert_ne!(db1.name(), db2.name());

        db1.close().await.unwrap();
        db2.close().await.unwrap();
        for p in [&first, &second] {
            let p = p.to_str().unwrap();
            for suffix in ["", "-wal", "-shm"] {
                let _ = std::fs::remove_file(format!("{}{}", p, suffix));
            }
        }
    }
}

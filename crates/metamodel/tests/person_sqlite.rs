#![cfg(feature = "sqlite")]

use metamodel::prelude::*;
use metamodel::{DataErrorKind, UsageErrorKind};

#[derive(Debug, Clone, Default, PartialEq)]
struct Person {
    id: u64,
    name: String,
    age: Nullable<i32>,
    birth: DateTime,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Pet {
    id: u64,
    owner: u64,
    name: String,
}

impl_object!(Person, Pet);

fn registry() -> Registry {
    let person = MetaObject::builder::<Person>("Person")
        .field(meta_field!(Person, id).primary_key(true).auto_increment(true))
        .field(meta_field!(Person, name))
        .field(meta_field!(Person, age))
        .field(meta_field!(Person, birth))
        .build()
        .expect("person metadata");
    let pet = MetaObject::builder::<Pet>("Pet")
        .field(meta_field!(Pet, id).primary_key(true).auto_increment(true))
        .field(meta_field!(Pet, owner))
        .field(meta_field!(Pet, name))
        .build()
        .expect("pet metadata");
    Registry::builder()
        .object(person)
        .object(pet)
        .build()
        .expect("registry")
}

fn open() -> Transaction<SqliteConnector> {
    let tx = metamodel::sqlite::open(&SqliteConfig::memory()).expect("open sqlite memory db");
    Custom::new(
        "CREATE TABLE Person (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL, \
         age INTEGER, birth TEXT NOT NULL)",
    )
    .exec(&tx)
    .expect("create Person");
    Custom::new(
        "CREATE TABLE Pet (id INTEGER PRIMARY KEY AUTOINCREMENT, \
         owner INTEGER NOT NULL REFERENCES Person(id), name TEXT NOT NULL)",
    )
    .exec(&tx)
    .expect("create Pet");
    tx
}

fn person(name: &str, age: Option<i32>, year: i32) -> Person {
    Person {
        id: 0,
        name: name.to_string(),
        age: age.map_or_else(Nullable::null, Nullable::new),
        birth: DateTime::date(year, Month::January, 2).expect("valid date"),
    }
}

fn insert(
    registry: &Registry,
    tx: &Transaction<SqliteConnector>,
    record: Person,
) -> Storable<Person> {
    let mut storable = Storable::new(registry, record).expect("storable");
    let affected = Insert::new(&mut storable).exec(tx).expect("insert");
    assert_eq!(affected, 1);
    storable
}

fn all_people(registry: &Registry, tx: &Transaction<SqliteConnector>) -> Vec<Person> {
    let id = Column::<Person, u64>::of(registry, "id").expect("id column");
    let mut row = Storable::new(registry, Person::default()).expect("storable");
    Select::new(&mut row)
        .order_asc(&id)
        .exec(tx)
        .expect("select")
        .fetch_all()
        .expect("fetch")
}

#[test]
fn insert_skips_generated_and_unset_columns() {
    let registry = registry();
    let tx = open();

    let mut alice =
        Storable::new(&registry, person("Alice", None, 2020)).expect("storable");
    let (sql, params) = Insert::new(&mut alice)
        .build_with_dialect(Dialect::Sqlite)
        .expect("build insert");
    assert_eq!(sql, r#"INSERT INTO "Person" ("name", "birth") VALUES (?1, ?2)"#);
    assert_eq!(
        params,
        vec![
            Value::String("Alice".to_string()),
            Value::DateTime(DateTime::date(2020, Month::January, 2).expect("valid date")),
        ]
    );

    Insert::new(&mut alice).exec(&tx).expect("insert");
    assert_eq!(alice.id, 1);
    assert_eq!(tx.open_statements(), 0);

    let bob = insert(&registry, &tx, person("Bob", Some(40), 1984));
    assert_eq!(bob.id, 2);

    let stored = all_people(&registry, &tx);
    assert_eq!(stored, vec![alice.record().clone(), bob.record().clone()]);
    assert!(!stored[0].age.is_set());
}

#[test]
fn select_filters_orders_and_pages() {
    let registry = registry();
    let tx = open();
    insert(&registry, &tx, person("Alice", Some(30), 1994));
    insert(&registry, &tx, person("Bob", None, 1980));
    insert(&registry, &tx, person("Carol", Some(25), 1999));

    let name = Column::<Person, String>::of(&registry, "name").expect("name column");
    let age = Column::<Person, Nullable<i32>>::of(&registry, "age").expect("age column");
    let mut row = Storable::new(&registry, Person::default()).expect("storable");

    let adults = Select::new(&mut row)
        .filter(age.is_not_null())
        .order_desc(&age)
        .exec(&tx)
        .expect("select")
        .fetch_all()
        .expect("fetch");
    let names: Vec<_> = adults.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["Alice", "Carol"]);

    let mut cursor = Select::new(&mut row)
        .order_asc(&name)
        .limit(1)
        .offset(1)
        .exec(&tx)
        .expect("select page");
    assert_eq!(tx.open_statements(), 1);
    assert!(cursor.fetch_next().expect("first row"));
    assert_eq!(cursor.current().name, "Bob");
    assert!(!cursor.current().age.is_set());
    assert!(!cursor.fetch_next().expect("end of rows"));
    assert!(!cursor.fetch_next().expect("still done"));
    drop(cursor);
    assert_eq!(tx.open_statements(), 0);

    let born = Column::<Person, DateTime>::of(&registry, "birth").expect("birth column");
    let cutoff = DateTime::date(1990, Month::January, 1).expect("valid date");
    let young = Select::new(&mut row)
        .filter(born.ge(cutoff) & name.like("C%"))
        .exec(&tx)
        .expect("select")
        .fetch_all()
        .expect("fetch");
    assert_eq!(young.len(), 1);
    assert_eq!(young[0].name, "Carol");
}

#[test]
fn inner_join_filters_on_related_rows() {
    let registry = registry();
    let tx = open();
    let alice = insert(&registry, &tx, person("Alice", None, 1990));
    insert(&registry, &tx, person("Bob", None, 1991));

    let mut rex = Storable::new(
        &registry,
        Pet {
            id: 0,
            owner: alice.id,
            name: "Rex".to_string(),
        },
    )
    .expect("storable");
    Insert::new(&mut rex).exec(&tx).expect("insert pet");
    assert_eq!(rex.id, 1);

    let person_id = Column::<Person, u64>::of(&registry, "id").expect("id column");
    let owner = Column::<Pet, u64>::of(&registry, "owner").expect("owner column");
    let pet_name = Column::<Pet, String>::of(&registry, "name").expect("pet name column");
    let pets = registry.meta_of::<Pet>().expect("pet metadata");

    let mut row = Storable::new(&registry, Person::default()).expect("storable");
    let owners = Select::new(&mut row)
        .inner_join_on(pets, owner.eq(&person_id))
        .expect("join")
        .filter(pet_name.eq("Rex"))
        .exec(&tx)
        .expect("select")
        .fetch_all()
        .expect("fetch");
    assert_eq!(owners.len(), 1);
    assert_eq!(owners[0].name, "Alice");

    let err = Select::new(&mut row)
        .inner_join(pets)
        .expect("inner join")
        .outer_join(pets)
        .unwrap_err();
    assert_eq!(err.usage_kind(), Some(UsageErrorKind::MixedJoins));
}

#[test]
fn update_by_key_and_by_filter() {
    let registry = registry();
    let tx = open();
    insert(&registry, &tx, person("Alice", Some(30), 1994));
    let mut bob = insert(&registry, &tx, person("Bob", None, 1980));

    let age = Column::<Person, Nullable<i32>>::of(&registry, "age").expect("age column");
    let affected = Update::new(&bob)
        .set(age.assign(Nullable::new(41)))
        .by_primary_key()
        .exec(&tx)
        .expect("update age");
    assert_eq!(affected, 1);

    bob.name = "Robert".to_string();
    bob.age.set(42);
    Update::new(&bob)
        .set_all_from_record()
        .expect("assignments")
        .by_primary_key()
        .exec(&tx)
        .expect("update record");

    let row = Storable::new(&registry, Person::default()).expect("storable");
    let affected = Update::new(&row)
        .set(age.assign_expr(age.expr() + 1))
        .filter(age.is_not_null())
        .exec(&tx)
        .expect("bump ages");
    assert_eq!(affected, 2);

    let people = all_people(&registry, &tx);
    assert_eq!(people[0].age, Nullable::new(31));
    assert_eq!(people[1].name, "Robert");
    assert_eq!(people[1].age, Nullable::new(43));

    let err = Update::new(&row).exec(&tx).unwrap_err();
    assert_eq!(err.usage_kind(), Some(UsageErrorKind::EmptyUpdate));
    assert_eq!(tx.open_statements(), 0);
}

#[test]
fn delete_by_key_and_by_filter() {
    let registry = registry();
    let tx = open();
    insert(&registry, &tx, person("Alice", None, 1990));
    let bob = insert(&registry, &tx, person("Bob", None, 1991));
    insert(&registry, &tx, person("Anna", None, 1992));

    assert_eq!(
        Delete::new(&bob).by_primary_key().exec(&tx).expect("delete bob"),
        1
    );

    let name = Column::<Person, String>::of(&registry, "name").expect("name column");
    let row = Storable::new(&registry, Person::default()).expect("storable");
    assert_eq!(
        Delete::new(&row)
            .filter(name.eq("Anna"))
            .exec(&tx)
            .expect("delete anna"),
        1
    );

    let left = all_people(&registry, &tx);
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].name, "Alice");
}

#[test]
fn rollback_discards_and_commit_keeps() {
    let registry = registry();
    let tx = open();

    tx.begin().expect("begin");
    insert(&registry, &tx, person("Ghost", None, 2000));
    tx.rollback().expect("rollback");
    assert!(all_people(&registry, &tx).is_empty());

    tx.begin().expect("begin");
    insert(&registry, &tx, person("Alice", None, 2000));
    tx.commit().expect("commit");
    assert_eq!(all_people(&registry, &tx).len(), 1);

    let err = tx.commit().unwrap_err();
    assert_eq!(err.usage_kind(), Some(UsageErrorKind::NoActiveTransaction));
}

#[test]
fn null_column_into_required_field_fails() {
    let registry = registry();
    let tx = open();
    Custom::new("CREATE TABLE Loose (id INTEGER PRIMARY KEY, name TEXT, age INTEGER, birth TEXT)")
        .exec(&tx)
        .expect("create Loose");
    Custom::new("INSERT INTO Loose (id, name, age, birth) VALUES (1, NULL, NULL, '2000-01-01 00:00:00')")
        .exec(&tx)
        .expect("insert");

    let handle = tx
        .create_statement(metamodel::StatementKind::Select, "SELECT * FROM Loose")
        .expect("statement");
    let meta = registry.meta_of::<Person>().expect("person metadata");
    let mut target = Person::default();
    let err = tx.fetch_next(handle, &mut target, meta).unwrap_err();
    assert_eq!(err.data_kind(), Some(&DataErrorKind::IntegrityError));
    tx.close_statement(handle).expect("close");
}

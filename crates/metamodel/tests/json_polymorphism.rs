use metamodel::json::{self, JsonOptions, TypeMap};
use metamodel::prelude::*;
use metamodel::{DataErrorKind, Mandatoriness};
use serde_json::json;

meta_enum! {
    enum Role: Simple, default = Member {
        Member = 0,
        Admin = 1,
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Person {
    id: u64,
    name: String,
    age: Nullable<i32>,
    birth: DateTime,
    role: Role,
    nicknames: Vec<String>,
    pet: Variant,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Dog {
    name: String,
    good: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Fish {
    name: String,
    fins: u32,
}

impl_object!(Person, Dog, Fish);

fn registry() -> Registry {
    Registry::builder()
        .object(
            MetaObject::builder::<Person>("Person")
                .field(meta_field!(Person, id).primary_key(true).auto_increment(true))
                .field(meta_field!(Person, name).mandatoriness(Mandatoriness::Required))
                .field(meta_field!(Person, age))
                .field(meta_field!(Person, birth))
                .field(meta_field!(Person, role))
                .field(meta_field!(Person, nicknames))
                .field(meta_field!(Person, pet))
                .build()
                .expect("person metadata"),
        )
        .object(
            MetaObject::builder::<Dog>("Dog")
                .field(meta_field!(Dog, name))
                .field(meta_field!(Dog, good))
                .build()
                .expect("dog metadata"),
        )
        .object(
            MetaObject::builder::<Fish>("Fish")
                .field(meta_field!(Fish, name))
                .field(meta_field!(Fish, fins))
                .build()
                .expect("fish metadata"),
        )
        .build()
        .expect("registry")
}

fn alice() -> Person {
    Person {
        id: 7,
        name: "Alice".to_string(),
        age: Nullable::null(),
        birth: DateTime::new(1990, Month::May, 1, 13, 45, 9).expect("valid date"),
        role: Role::Admin,
        nicknames: vec!["Al".to_string()],
        pet: Variant::new(Dog {
            name: "Rex".to_string(),
            good: true,
        }),
    }
}

#[test]
fn person_round_trips_through_text() {
    let registry = registry();
    let text = json::to_string(&registry, &alice()).expect("encode");
    let back: Person = json::from_str(&registry, &text).expect("decode");
    assert_eq!(back, alice());
}

#[test]
fn encoded_shape() {
    let registry = registry();
    let value = json::to_value(&registry, &alice()).expect("encode");
    assert_eq!(
        value,
        json!({
            "id": 7,
            "name": "Alice",
            "age": null,
            "birth": "1990-05-01 13:45:09",
            "role": "Admin",
            "nicknames": ["Al"],
            "pet": { "@type": "Dog", "name": "Rex", "good": true }
        })
    );
}

#[test]
fn discriminant_selects_concrete_type() {
    let registry = registry();
    let value = json!({ "name": "Bob", "pet": { "@type": "Fish", "name": "Nemo", "fins": 3 } });
    let bob: Person = json::from_value(&registry, &value).expect("decode");
    assert_eq!(
        bob.pet.downcast_ref::<Fish>(),
        Some(&Fish {
            name: "Nemo".to_string(),
            fins: 3
        })
    );
    let again = json::to_value(&registry, &bob).expect("encode");
    assert_eq!(again["pet"]["@type"], "Fish");
}

#[test]
fn missing_or_unknown_discriminant_fails() {
    let registry = registry();
    let missing = json!({ "name": "Bob", "pet": { "name": "Nemo" } });
    let err = json::from_value::<Person>(&registry, &missing).unwrap_err();
    assert!(matches!(err.data_kind(), Some(DataErrorKind::UnknownType(_))));

    let dogs_only = TypeMap::new().insert::<Dog>("Dog");
    let fish = json!({ "name": "Bob", "pet": { "@type": "Fish", "name": "Nemo", "fins": 3 } });
    let err = json::from_value_with::<Person>(&registry, &dogs_only, &JsonOptions::default(), &fish)
        .unwrap_err();
    assert_eq!(
        err.data_kind(),
        Some(&DataErrorKind::UnknownType("Fish".to_string()))
    );
}

#[test]
fn absent_fields_follow_mandatoriness() {
    let registry = registry();
    let err = json::from_value::<Person>(&registry, &json!({ "age": 3 })).unwrap_err();
    assert_eq!(err.data_kind(), Some(&DataErrorKind::MissingField));

    let bob: Person = json::from_value(&registry, &json!({ "name": "Bob" })).expect("decode");
    assert_eq!(bob.role, Role::Member);
    assert!(bob.nicknames.is_empty());
    assert!(!bob.age.is_set());
}

#[test]
fn enum_name_and_number_agree() {
    let registry = registry();
    let by_name: Person =
        json::from_value(&registry, &json!({ "name": "A", "role": "Admin" })).expect("by name");
    let by_number: Person =
        json::from_value(&registry, &json!({ "name": "A", "role": 1 })).expect("by number");
    assert_eq!(by_name, by_number);

    let err = json::from_value::<Person>(&registry, &json!({ "name": "A", "role": 9 })).unwrap_err();
    assert_eq!(err.data_kind(), Some(&DataErrorKind::UnknownEnumValue(9)));
}

//! Object types shared by the serializer tests.

use metamodel_core::{
    DateTime, MetaObject, Month, Nullable, Registry, Variant, impl_object, meta_enum, meta_field,
};

meta_enum! {
    pub(crate) enum Color: Simple, default = Red {
        Red = 1,
        Green = 2,
        Blue = 4,
    }
}

meta_enum! {
    pub(crate) enum Access: Bitset, default = Empty {
        Empty = 0,
        Read = 1,
        Write = 2,
        Exec = 4,
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Circle {
    pub center: Point,
    pub radius: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Square {
    pub side: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Drawing {
    pub title: String,
    pub count: u64,
    pub offset: i32,
    pub serial: i64,
    pub flags: u32,
    pub ratio: f32,
    pub weight: f64,
    pub visible: bool,
    pub layer: Nullable<i64>,
    pub created: DateTime,
    pub color: Color,
    pub access: u32,
    pub tags: Vec<String>,
    pub palette: Vec<Color>,
    pub scores: Vec<Nullable<i32>>,
    pub points: Vec<Point>,
    pub origin: Nullable<Point>,
    pub primary: Variant,
    pub shapes: Vec<Variant>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Grid {
    pub rows: Vec<Vec<i32>>,
}

impl_object!(Point, Circle, Square, Drawing, Grid);

pub(crate) fn registry() -> Registry {
    let point = MetaObject::builder::<Point>("Point")
        .field(meta_field!(Point, x))
        .field(meta_field!(Point, y))
        .build()
        .unwrap();
    let circle = MetaObject::builder::<Circle>("Circle")
        .field(meta_field!(Circle, center))
        .field(meta_field!(Circle, radius))
        .build()
        .unwrap();
    let square = MetaObject::builder::<Square>("Square")
        .field(meta_field!(Square, side))
        .build()
        .unwrap();
    let drawing = MetaObject::builder::<Drawing>("Drawing")
        .field(meta_field!(Drawing, title))
        .field(meta_field!(Drawing, count))
        .field(meta_field!(Drawing, offset))
        .field(meta_field!(Drawing, serial))
        .field(meta_field!(Drawing, flags))
        .field(meta_field!(Drawing, ratio))
        .field(meta_field!(Drawing, weight))
        .field(meta_field!(Drawing, visible))
        .field(meta_field!(Drawing, layer))
        .field(meta_field!(Drawing, created))
        .field(meta_field!(Drawing, color))
        .field(meta_field!(Drawing, access).enumeration(Access::descriptor()))
        .field(meta_field!(Drawing, tags))
        .field(meta_field!(Drawing, palette))
        .field(meta_field!(Drawing, scores))
        .field(meta_field!(Drawing, points))
        .field(meta_field!(Drawing, origin))
        .field(meta_field!(Drawing, primary))
        .field(meta_field!(Drawing, shapes))
        .build()
        .unwrap();
    let grid = MetaObject::builder::<Grid>("Grid")
        .field(meta_field!(Grid, rows))
        .build()
        .unwrap();
    Registry::builder()
        .object(point)
        .object(circle)
        .object(square)
        .object(drawing)
        .object(grid)
        .build()
        .unwrap()
}

pub(crate) fn sample() -> Drawing {
    Drawing {
        title: "plan".to_string(),
        count: 3,
        offset: -7,
        serial: -9_000_000_000,
        flags: 17,
        ratio: 0.5,
        weight: 2.25,
        visible: true,
        layer: Nullable::null(),
        created: DateTime::new(2020, Month::January, 2, 3, 4, 5).unwrap(),
        color: Color::Green,
        access: Access::Read as u32 | Access::Write as u32,
        tags: vec!["a".to_string(), "b".to_string()],
        palette: vec![Color::Red, Color::Blue],
        scores: vec![Nullable::new(1), Nullable::null()],
        points: vec![Point { x: 1.0, y: 2.0 }],
        origin: Nullable::new(Point { x: 0.0, y: 5.0 }),
        primary: Variant::new(Circle {
            center: Point { x: 1.0, y: 1.0 },
            radius: 1.5,
        }),
        shapes: vec![Variant::new(Square { side: 2.0 }), Variant::empty()],
    }
}

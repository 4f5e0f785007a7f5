//! The astronomy catalog and the users table.

use super::{ChildRef, FieldDef, FieldKind, Resource, TableDef};

use FieldKind::*;

pub static USERS: TableDef = TableDef {
    name: "users",
    label: "user",
    path: "users",
    fields: &[
        FieldDef::new("id", Int).read_only(),
        FieldDef::new("display_name", Text).required().max_length(100),
        FieldDef::new("email_address", Text).required().max_length(254),
        FieldDef::new("password_hash", Text).sensitive(),
        FieldDef::new("role", Text).read_only().default_sql("'NORMAL'"),
        FieldDef::new("enabled", Bool).default_sql("TRUE"),
        FieldDef::new("login_attempts", Int).sensitive().default_sql("0"),
        FieldDef::new("last_login_attempt_at", DateTime).sensitive(),
        FieldDef::new("created_at", DateTime).read_only().default_sql("NOW()"),
    ],
    unique: &["email_address"],
    children: &[],
    sole_owner: None,
};

pub static GALAXIES: TableDef = TableDef {
    name: "galaxies",
    label: "galaxy",
    path: "galaxies",
    fields: &[
        FieldDef::new("id", Int).read_only(),
        FieldDef::new("name", Text).required().max_length(120),
        FieldDef::new("galaxy_type", Text).max_length(40),
        FieldDef::new("distance_ly", Float),
        FieldDef::new("discovered_on", Date),
    ],
    unique: &["name"],
    children: &[ChildRef { table: &STARS, foreign_key: "galaxy_id" }],
    sole_owner: None,
};

pub static CONSTELLATIONS: TableDef = TableDef {
    name: "constellations",
    label: "constellation",
    path: "constellations",
    fields: &[
        FieldDef::new("id", Int).read_only(),
        FieldDef::new("name", Text).required().max_length(120),
        FieldDef::new("abbreviation", Text).max_length(3),
        FieldDef::new("area_sq_deg", Float),
    ],
    unique: &["name"],
    children: &[
        ChildRef { table: &STARS, foreign_key: "constellation_id" },
        ChildRef { table: &METEOR_SHOWERS, foreign_key: "constellation_id" },
    ],
    sole_owner: None,
};

pub static STARS: TableDef = TableDef {
    name: "stars",
    label: "star",
    path: "stars",
    fields: &[
        FieldDef::new("id", Int).read_only(),
        FieldDef::new("name", Text).required().max_length(120),
        FieldDef::new("spectral_type", Text).max_length(20),
        FieldDef::new("apparent_magnitude", Float),
        FieldDef::new("distance_ly", Float),
        FieldDef::new("galaxy_id", Int).required().references("galaxies"),
        FieldDef::new("constellation_id", Int).references("constellations"),
    ],
    unique: &[],
    children: &[
        ChildRef { table: &PLANETS, foreign_key: "star_id" },
        ChildRef { table: &ASTEROIDS, foreign_key: "star_id" },
    ],
    sole_owner: None,
};

pub static PLANETS: TableDef = TableDef {
    name: "planets",
    label: "planet",
    path: "planets",
    fields: &[
        FieldDef::new("id", Int).read_only(),
        FieldDef::new("name", Text).required().max_length(120),
        FieldDef::new("radius_km", Float),
        FieldDef::new("orbital_period_days", Float),
        FieldDef::new("habitable", Bool),
        FieldDef::new("star_id", Int).required().references("stars"),
    ],
    unique: &[],
    children: &[ChildRef { table: &MOONS, foreign_key: "planet_id" }],
    sole_owner: None,
};

pub static MOONS: TableDef = TableDef {
    name: "moons",
    label: "moon",
    path: "moons",
    fields: &[
        FieldDef::new("id", Int).read_only(),
        FieldDef::new("name", Text).required().max_length(120),
        FieldDef::new("radius_km", Float),
        FieldDef::new("planet_id", Int).required().references("planets"),
    ],
    unique: &[],
    children: &[],
    sole_owner: None,
};

pub static ASTEROIDS: TableDef = TableDef {
    name: "asteroids",
    label: "asteroid",
    path: "asteroids",
    fields: &[
        FieldDef::new("id", Int).read_only(),
        FieldDef::new("name", Text).required().max_length(120),
        FieldDef::new("diameter_km", Float),
        FieldDef::new("discovered_on", Date),
        FieldDef::new("star_id", Int).required().references("stars"),
    ],
    unique: &[],
    children: &[],
    sole_owner: None,
};

pub static METEOR_SHOWERS: TableDef = TableDef {
    name: "meteor_showers",
    label: "meteor shower",
    path: "meteor-showers",
    fields: &[
        FieldDef::new("id", Int).read_only(),
        FieldDef::new("name", Text).required().max_length(120),
        FieldDef::new("peak_date", Date),
        FieldDef::new("zenithal_hourly_rate", Int),
        FieldDef::new("constellation_id", Int).required().references("constellations"),
    ],
    unique: &["constellation_id"],
    children: &[],
    sole_owner: Some("constellation_id"),
};

/// Every table, parents before children (the order DDL is applied in).
pub static CATALOG: [&TableDef; 8] = [
    &USERS,
    &GALAXIES,
    &CONSTELLATIONS,
    &STARS,
    &PLANETS,
    &MOONS,
    &ASTEROIDS,
    &METEOR_SHOWERS,
];

macro_rules! resource {
    ($ty:ident, $table:ident) => {
        #[derive(Clone, Copy, Debug, Default)]
        pub struct $ty;

        impl Resource for $ty {
            fn table() -> &'static TableDef {
                &$table
            }
        }
    };
}

resource!(User, USERS);
resource!(Galaxy, GALAXIES);
resource!(Constellation, CONSTELLATIONS);
resource!(Star, STARS);
resource!(Planet, PLANETS);
resource!(Moon, MOONS);
resource!(Asteroid, ASTEROIDS);
resource!(MeteorShower, METEOR_SHOWERS);

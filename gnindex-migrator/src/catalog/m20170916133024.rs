use gnindex_schema::{IndexSpec, Operation};
use gnindex_store::MigrationId;

use crate::{
    table::{ident, Decomposed, NameStrings},
    unit::MigrationUnit,
};

/// Trigram indexes keep the names they were first deployed with.
fn indexes() -> Vec<(String, IndexSpec)> {
    let name_strings = ident(NameStrings::Table);

    let mut indexes = vec![
        (
            "namestrings_name__gin_index".to_owned(),
            IndexSpec::trigram(&name_strings, ident(NameStrings::Name)),
        ),
        (
            "namestrings_canonical__gin_index".to_owned(),
            IndexSpec::trigram(&name_strings, ident(NameStrings::Canonical)),
        ),
    ];

    indexes.extend(Decomposed::ALL.iter().map(|decomposed| {
        (
            format!("ns_{}__gin_index", decomposed.short()),
            IndexSpec::trigram(decomposed.table(), decomposed.column()),
        )
    }));

    indexes
}

pub fn unit() -> MigrationUnit {
    let indexes = indexes();

    let up = indexes
        .iter()
        .fold(Operation::new(), |up, (name, spec)| {
            up.create_index(spec.clone().named(name))
        });

    let down = indexes
        .iter()
        .fold(Operation::new(), |down, (name, _)| down.drop_index(name));

    MigrationUnit::new(
        MigrationId(20170916133024),
        "trigram indexes on name strings and their words",
        up,
    )
    .with_down(down)
}

use gnindex_schema::{ColumnDef, Operation};
use gnindex_store::MigrationId;

use crate::{
    table::{ident, NameStrings},
    unit::MigrationUnit,
};

pub fn unit() -> MigrationUnit {
    MigrationUnit::change(
        MigrationId(20170912134714),
        "name_strings: add canonical_ranked",
        Operation::new().add_column(
            ident(NameStrings::Table),
            ColumnDef::string(ident(NameStrings::CanonicalRanked), 255),
        ),
    )
}

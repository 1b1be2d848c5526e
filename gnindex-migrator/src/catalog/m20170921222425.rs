use gnindex_schema::{ColumnDef, Operation};
use gnindex_store::MigrationId;

use crate::{
    table::{ident, NameStrings},
    unit::MigrationUnit,
};

pub fn unit() -> MigrationUnit {
    MigrationUnit::change(
        MigrationId(20170921222425),
        "name_strings: add parsing_quality",
        Operation::new().add_column(
            ident(NameStrings::Table),
            ColumnDef::small_integer(ident(NameStrings::ParsingQuality)),
        ),
    )
}

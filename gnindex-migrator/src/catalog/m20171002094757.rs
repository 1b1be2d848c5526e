use gnindex_schema::{ColumnDef, Operation};
use gnindex_store::MigrationId;

use crate::{
    table::{ident, DataSources},
    unit::MigrationUnit,
};

pub fn unit() -> MigrationUnit {
    let table = ident(DataSources::Table);

    MigrationUnit::change(
        MigrationId(20171002094757),
        "data_sources: add curation quality columns",
        Operation::new()
            .add_column(&table, ColumnDef::boolean(ident(DataSources::IsCurated)))
            .add_column(
                &table,
                ColumnDef::boolean(ident(DataSources::IsAutoCurated)),
            )
            .add_column(&table, ColumnDef::integer(ident(DataSources::RecordCount))),
    )
}

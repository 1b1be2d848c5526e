use gnindex_schema::Operation;
use gnindex_store::MigrationId;

use crate::{
    table::{ident, DataSources},
    unit::MigrationUnit,
};

pub fn unit() -> MigrationUnit {
    let table = ident(DataSources::Table);

    let up = [
        DataSources::IsCurated,
        DataSources::IsAutoCurated,
        DataSources::RecordCount,
    ]
    .iter()
    .fold(Operation::new(), |up, column| {
        up.change_column_null(&table, ident(*column), false)
    });

    MigrationUnit::change(
        MigrationId(20171002165405),
        "data_sources: curation quality columns not null",
        up,
    )
}

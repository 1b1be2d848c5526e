use gnindex_schema::{IndexSpec, Operation};
use gnindex_store::MigrationId;

use crate::{
    table::{ident, NameStringIndices},
    unit::MigrationUnit,
};

pub fn unit() -> MigrationUnit {
    MigrationUnit::change(
        MigrationId(20170815111416),
        "name_string_indices: btree index on (data_source_id, taxon_id)",
        Operation::new().create_index(IndexSpec::btree(
            ident(NameStringIndices::Table),
            [
                ident(NameStringIndices::DataSourceId),
                ident(NameStringIndices::TaxonId),
            ],
        )),
    )
}

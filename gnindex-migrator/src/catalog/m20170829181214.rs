use gnindex_schema::{IndexSpec, Operation};
use gnindex_store::MigrationId;

use crate::{
    table::{Decomposed, NAME_UUID},
    unit::MigrationUnit,
};

pub fn unit() -> MigrationUnit {
    let up = Decomposed::ALL
        .iter()
        .fold(Operation::new(), |up, decomposed| {
            up.create_index(IndexSpec::btree(decomposed.table(), [NAME_UUID]))
        });

    MigrationUnit::change(
        MigrationId(20170829181214),
        "decomposed name tables: btree index on name_uuid",
        up,
    )
}

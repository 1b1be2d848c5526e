use gnindex_schema::{IndexSpec, NormalizationFunction, Operation};
use gnindex_store::MigrationId;

use crate::{
    table::{ident, NameStrings},
    unit::MigrationUnit,
};

pub const F_UNACCENT: &str = "f_unaccent";
const INDEX_NAME: &str = "name_strings__name_unaccent";

pub fn unit() -> MigrationUnit {
    // unaccent() is only STABLE; pinning the dictionary lets the wrapper be
    // IMMUTABLE and back an index.
    let function =
        NormalizationFunction::new(F_UNACCENT, "SELECT public.unaccent('public.unaccent', $1)");
    let signature = function.signature();

    let index = IndexSpec::btree(ident(NameStrings::Table), [ident(NameStrings::Name)])
        .expression(format!("{F_UNACCENT}(name)"))
        .operator_class("text_pattern_ops")
        .named(INDEX_NAME);

    MigrationUnit::new(
        MigrationId(20171204101828),
        "name_strings: accent-insensitive prefix index",
        Operation::new().create_function(function).create_index(index),
    )
    .with_down(
        Operation::new()
            .drop_index(INDEX_NAME)
            .drop_function(signature),
    )
}

//! Identifiers of the Global Names index tables touched by the built-in
//! migrations. The tables themselves are created outside of this crate.

use sea_query::Iden;

pub fn ident(iden: impl Iden) -> String {
    iden.to_string()
}

#[derive(Iden, Clone, Copy)]
pub enum NameStrings {
    Table,
    Name,
    Canonical,
    CanonicalRanked,
    ParsingQuality,
}

#[derive(Iden, Clone, Copy)]
pub enum NameStringIndices {
    Table,
    DataSourceId,
    TaxonId,
}

#[derive(Iden, Clone, Copy)]
pub enum DataSources {
    Table,
    IsCurated,
    IsAutoCurated,
    RecordCount,
}

/// Tables holding one word kind of a parsed name string each, keyed back to
/// `name_strings` by `name_uuid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decomposed {
    AuthorWords,
    Genus,
    Species,
    Subspecies,
    Uninomial,
    Year,
}

impl Decomposed {
    pub const ALL: [Decomposed; 6] = [
        Decomposed::AuthorWords,
        Decomposed::Genus,
        Decomposed::Species,
        Decomposed::Subspecies,
        Decomposed::Uninomial,
        Decomposed::Year,
    ];

    pub fn table(&self) -> &'static str {
        match self {
            Decomposed::AuthorWords => "name_strings__author_words",
            Decomposed::Genus => "name_strings__genus",
            Decomposed::Species => "name_strings__species",
            Decomposed::Subspecies => "name_strings__subspecies",
            Decomposed::Uninomial => "name_strings__uninomial",
            Decomposed::Year => "name_strings__year",
        }
    }

    /// The word column, named after the word kind.
    pub fn column(&self) -> &'static str {
        match self {
            Decomposed::AuthorWords => "author_word",
            Decomposed::Genus => "genus",
            Decomposed::Species => "species",
            Decomposed::Subspecies => "subspecies",
            Decomposed::Uninomial => "uninomial",
            Decomposed::Year => "year",
        }
    }

    /// Short form used by the trigram index names (`ns_genus__gin_index`).
    pub fn short(&self) -> &'static str {
        self.table().trim_start_matches("name_strings__")
    }
}

pub const NAME_UUID: &str = "name_uuid";

//! The Global Names index migrations, 2017.

mod m20170815111416;
mod m20170829181214;
mod m20170912134714;
mod m20170916133024;
mod m20170921222425;
mod m20171002094757;
mod m20171002165405;
mod m20171204101828;

pub use m20171204101828::F_UNACCENT;

use crate::{error::Result, registry::Registry};

/// Registry holding every built-in migration.
pub fn catalog() -> Result<Registry> {
    Registry::from_units([
        m20170815111416::unit(),
        m20170829181214::unit(),
        m20170912134714::unit(),
        m20170916133024::unit(),
        m20170921222425::unit(),
        m20171002094757::unit(),
        m20171002165405::unit(),
        m20171204101828::unit(),
    ])
}

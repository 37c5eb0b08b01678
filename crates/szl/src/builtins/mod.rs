//! Built-in command packages.
//!
//! Each submodule is one extension bundle registered through the public
//! registration API at interpreter construction, exactly as an external
//! package would install itself.

pub(crate) mod dict;
pub(crate) mod exc;
pub(crate) mod io;
pub(crate) mod list;
pub(crate) mod logic;
pub(crate) mod loops;
pub(crate) mod math;
pub(crate) mod obj;
pub(crate) mod proc;
pub(crate) mod strings;

use crate::error::SzlResult;
use crate::interp::Interp;

pub(crate) fn register_all(interp: &mut Interp) -> SzlResult<()> {
    obj::register(interp)?;
    proc::register(interp)?;
    exc::register(interp)?;
    loops::register(interp)?;
    logic::register(interp)?;
    math::register(interp)?;
    strings::register(interp)?;
    list::register(interp)?;
    dict::register(interp)?;
    io::register(interp)?;
    Ok(())
}

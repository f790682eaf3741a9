//! Platform command

use anyhow::Result;

pub fn run() -> Result<()> {
    println!("{}", patchup::platform());
    Ok(())
}

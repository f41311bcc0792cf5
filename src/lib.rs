pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod ui;

use std::error::Error;

pub fn run() -> Result<(), Box<dyn Error>> {
    ui::run()
}

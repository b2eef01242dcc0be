use crate::error::Result;
use crate::settings::{load_settings, save_settings, settings_path};

pub fn run(output_dir: Option<String>, database: Option<String>) -> Result<()> {
    let mut settings = load_settings();
    let changed = output_dir.is_some() || database.is_some();
    if let Some(d) = output_dir {
        settings.output_dir = d;
    }
    if let Some(p) = database {
        settings.database_path = p;
    }
    if changed {
        save_settings(&settings)?;
        println!("Saved {}", settings_path().display());
    }
    println!("output_dir:    {}", settings.output_dir);
    println!("database_path: {}", settings.database_path);
    Ok(())
}

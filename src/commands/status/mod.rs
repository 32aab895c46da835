use anyhow::Result;
use console::style;

use crate::models::sync_state::SyncState;
use crate::utils;

pub async fn run<E: utils::Env>(env: &E) -> Result<()> {
    let config = utils::load_config(env)?;
    let state_path = config.state_file_in(&env.current_dir()?);
    let state = SyncState::peek(&state_path);

    if state.is_empty() {
        println!("No mods synced yet. Run 'bananasync sync' to fetch them.");
        return Ok(());
    }

    println!("{} mods synced ({}):", state.len(), state_path.display());
    println!("  {:<12} {}", style("ID").bold(), style("Last updated").bold());
    for (mod_id, record) in state.iter() {
        println!("  {:<12} {}", mod_id, utils::format_date(record.updated_at));
    }

    Ok(())
}

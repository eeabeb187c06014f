use batchsync::db;
use batchsync::migration::{Migrator, MigratorTrait};
use console::style;

use crate::MigrateAction;

pub(crate) async fn handle_migrate(
    action: MigrateAction,
    database_url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let db = db::connect(database_url).await?;

    match action {
        MigrateAction::Up => {
            let pending = Migrator::get_pending_migrations(&db).await?.len();
            Migrator::up(&db, None).await?;
            println!("{} Applied {} migration(s)", style("✓").green().bold(), pending);
        }
        MigrateAction::Down => {
            Migrator::down(&db, Some(1)).await?;
            println!("{} Rolled back the latest migration", style("✓").green().bold());
        }
        MigrateAction::Status => {
            for migration in Migrator::get_applied_migrations(&db).await? {
                println!("  {} {}", style("applied").green(), migration.name());
            }
            for migration in Migrator::get_pending_migrations(&db).await? {
                println!("  {} {}", style("pending").yellow(), migration.name());
            }
        }
        MigrateAction::Fresh => {
            Migrator::fresh(&db).await?;
            println!(
                "{} Dropped batch_sync_configs and reapplied all migrations",
                style("✓").green().bold()
            );
        }
    }

    Ok(())
}

//! Shell completions and man pages, generated from the clap definition.

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::CommandFactory;

use crate::Cli;

const BIN_NAME: &str = "batchsync";

fn render_completions(shell: clap_complete::Shell) -> Vec<u8> {
    let mut cmd = Cli::command();
    let mut out = Vec::new();
    clap_complete::generate(shell, &mut cmd, BIN_NAME, &mut out);
    out
}

fn render_man_page() -> std::io::Result<Vec<u8>> {
    let mut out = Vec::new();
    clap_mangen::Man::new(Cli::command()).render(&mut out)?;
    Ok(out)
}

/// Write the main page plus one page per subcommand into `dir`.
fn write_man_pages(dir: &Path) -> std::io::Result<usize> {
    std::fs::create_dir_all(dir)?;
    clap_mangen::generate_to(Cli::command(), dir)?;
    Ok(std::fs::read_dir(dir)?.count())
}

pub(crate) fn handle_completions(
    shell: clap_complete::Shell,
) -> Result<(), Box<dyn std::error::Error>> {
    std::io::stdout().write_all(&render_completions(shell))?;
    Ok(())
}

pub(crate) fn handle_man(output: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    match output {
        Some(dir) => {
            let pages = write_man_pages(&dir)?;
            println!("Generated {} man pages in: {}", pages, dir.display());
        }
        None => std::io::stdout().write_all(&render_man_page()?)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_completions_name_the_binary() {
        let script = String::from_utf8(render_completions(clap_complete::Shell::Zsh)).unwrap();
        assert!(script.contains("#compdef batchsync"));
    }

    #[test]
    fn test_man_page_title() {
        let page = String::from_utf8(render_man_page().unwrap()).unwrap();
        assert!(page.to_lowercase().contains(".th batchsync"));
    }

    #[test]
    fn test_man_pages_cover_subcommands() {
        let dir = std::env::temp_dir().join(format!("batchsync-man-{}", uuid::Uuid::new_v4()));

        let pages = write_man_pages(&dir).unwrap();
        assert!(dir.join("batchsync-run.1").exists());
        assert!(pages > 1);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}

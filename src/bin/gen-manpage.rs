//! Man page generator for romclient
//!
//! Writes `romclient.1` plus one `romclient-<subcommand>.1` page per
//! subcommand.
//!
//! Usage: cargo run --bin gen-manpage -- [output-dir]

use clap::{Command, CommandFactory};
use std::fs;
use std::path::PathBuf;

#[path = "../cli.rs"]
mod cli;

/// Render the top level page and one page per subcommand
fn render_pages(mut cmd: Command) -> std::io::Result<Vec<(String, Vec<u8>)>> {
    // Propagate global args such as -v into the subcommands
    cmd.build();

    let name = cmd.get_name().to_string();
    let mut pages = Vec::new();

    for sub in cmd
        .get_subcommands()
        .filter(|sub| !sub.is_hide_set() && sub.get_name() != "help")
    {
        let page = format!("{}-{}", name, sub.get_name());
        let mut buffer = Vec::new();
        clap_mangen::Man::new(sub.clone())
            .title(page.to_uppercase())
            .render(&mut buffer)?;
        pages.push((format!("{}.1", page), buffer));
    }

    let mut buffer = Vec::new();
    clap_mangen::Man::new(cmd).render(&mut buffer)?;
    pages.insert(0, (format!("{}.1", name), buffer));

    Ok(pages)
}

fn main() -> std::io::Result<()> {
    let output_dir = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("man"));

    fs::create_dir_all(&output_dir)?;

    for (file, buffer) in render_pages(cli::Cli::command())? {
        let output_path = output_dir.join(file);
        fs::write(&output_path, buffer)?;
        println!("Man page generated at: {}", output_path.display());
    }

    println!("\nTo view a man page:");
    println!("  man -l {}", output_dir.join("romclient.1").display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_page_per_subcommand() {
        let pages = render_pages(cli::Cli::command()).unwrap();
        let files: Vec<&str> = pages.iter().map(|(file, _)| file.as_str()).collect();
        assert_eq!(
            files,
            vec![
                "romclient.1",
                "romclient-dump.1",
                "romclient-list-ports.1",
                "romclient-list-bankswitch.1",
            ]
        );

        let dump = String::from_utf8_lossy(&pages[1].1);
        assert!(dump.contains("bankswitch"));
    }
}

use std::io::{BufRead, IsTerminal};

use anyhow::Result;
use dialoguer::Input;
use tm_core::config::DitherMode;

/// Menu affiché avant la saisie du mode de tramage.
#[must_use]
pub fn dither_menu() -> String {
    let mut menu = String::from("Select dithering mode:\n");
    for choice in 0..3 {
        menu.push_str(&format!(
            "  {choice}: {}\n",
            DitherMode::from_choice(choice).label()
        ));
    }
    menu
}

/// Read the dither choice from one line of piped input (`echo 2 | tilemosaic ...`).
///
/// An empty input means no dithering.
///
/// # Errors
/// Returns an error if reading fails.
pub fn read_dither_choice<R: BufRead>(mut reader: R) -> Result<DitherMode> {
    let mut line = String::new();
    reader.read_line(&mut line)?;
    if line.trim().is_empty() {
        log::info!("Aucun mode de tramage fourni sur l'entrée : pas de tramage.");
        return Ok(DitherMode::None);
    }
    Ok(DitherMode::parse_lenient(&line))
}

/// Ask for the dither mode.
///
/// On a terminal the menu is shown and a choice is prompted. Otherwise one line
/// is read from stdin.
///
/// # Errors
/// Returns an error if the terminal interaction or the read fails.
pub fn ask_dither_mode() -> Result<DitherMode> {
    let stdin = std::io::stdin();
    if !stdin.is_terminal() {
        return read_dither_choice(stdin.lock());
    }

    eprint!("{}", dither_menu());
    let choice: u32 = Input::new()
        .with_prompt("Mode")
        .default(0u32)
        .interact_text()?;
    Ok(DitherMode::from_choice(choice))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn piped_choice_is_read() {
        assert_eq!(
            read_dither_choice(&b"2\n"[..]).unwrap(),
            DitherMode::ErrorDiffusion
        );
        assert_eq!(
            read_dither_choice(&b" ordered \n"[..]).unwrap(),
            DitherMode::Ordered
        );
        assert_eq!(read_dither_choice(&b"9\n"[..]).unwrap(), DitherMode::None);
    }

    #[test]
    fn empty_pipe_means_no_dithering() {
        assert_eq!(read_dither_choice(&b""[..]).unwrap(), DitherMode::None);
    }

    #[test]
    fn menu_lists_three_modes_in_order() {
        let menu = dither_menu();
        let lines: Vec<&str> = menu.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1], "  0: No dithering");
        assert_eq!(lines[2], "  1: Ordered dithering");
        assert_eq!(lines[3], "  2: Error-diffusion dithering");
    }
}

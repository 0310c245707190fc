//! Output rendering and formatting

use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Color, ContentArrangement, Table};
use console::{Style, Term};
use ota_types::{
    AvailableUpdate, ColorChoice, PackagePayloadDescriptor, PersistedUpdateRecord, UpdaterState,
};
use serde::Serialize;
use std::io;
use std::path::PathBuf;

use crate::packages::PackageFile;

/// What a command produced
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CommandResult {
    /// Package inspected
    Descriptor {
        path: PathBuf,
        device: String,
        descriptor: PackagePayloadDescriptor,
    },
    /// Current state and record
    Status {
        state: Option<UpdaterState>,
        record: PersistedUpdateRecord,
    },
    /// Result of asking the update server
    Update {
        device: String,
        build_time: i64,
        update: Option<AvailableUpdate>,
    },
    /// Package finished downloading
    Downloaded {
        url: String,
        path: PathBuf,
        size: u64,
    },
    /// Packages found in the packages directory
    Packages {
        dir: PathBuf,
        packages: Vec<PackageFile>,
    },
    /// Success message
    Success { message: String },
}

impl CommandResult {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Output renderer for CLI results
#[derive(Clone)]
pub struct OutputRenderer {
    /// Use JSON output format
    json_output: bool,
    /// Color configuration
    color_choice: ColorChoice,
    /// Terminal instance
    term: Term,
}

impl OutputRenderer {
    /// Create new output renderer
    pub fn new(json_output: bool, color_choice: ColorChoice) -> Self {
        Self {
            json_output,
            color_choice,
            term: Term::stdout(),
        }
    }

    /// Render command result
    pub fn render_result(&self, result: &CommandResult) -> io::Result<()> {
        if self.json_output {
            let json = result.to_json().map_err(io::Error::other)?;
            println!("{json}");
            return Ok(());
        }

        match result {
            CommandResult::Descriptor {
                path,
                device,
                descriptor,
            } => self.render_descriptor(path, device, descriptor),
            CommandResult::Status { state, record } => self.render_status(*state, record),
            CommandResult::Update {
                device,
                build_time,
                update,
            } => self.render_update(device, *build_time, update.as_ref()),
            CommandResult::Downloaded { path, size, .. } => self.render_success_message(&format!(
                "downloaded {} ({size} bytes)",
                path.display()
            )),
            CommandResult::Packages { dir, packages } => self.render_packages(dir, packages),
            CommandResult::Success { message } => self.render_success_message(message),
        }
    }

    fn render_descriptor(
        &self,
        path: &std::path::Path,
        device: &str,
        descriptor: &PackagePayloadDescriptor,
    ) -> io::Result<()> {
        println!("{}", self.style_bold(&path.display().to_string()));
        println!();

        let mut table = self.new_table();
        table.set_header(vec![
            Cell::new("Field").add_attribute(Attribute::Bold),
            Cell::new("Value").add_attribute(Attribute::Bold),
        ]);
        table.add_row(vec![Cell::new("Device"), Cell::new(device)]);
        table.add_row(vec![
            Cell::new("Payload offset"),
            Cell::new(descriptor.offset.to_string()),
        ]);
        table.add_row(vec![
            Cell::new("Payload size"),
            Cell::new(descriptor.size.to_string()),
        ]);
        for header in &descriptor.headers {
            table.add_row(vec![Cell::new("Header"), Cell::new(header)]);
        }

        let mut metadata: Vec<_> = descriptor.metadata.iter().collect();
        metadata.sort();
        for (key, value) in metadata {
            table.add_row(vec![Cell::new(format!("metadata {key}")), Cell::new(value)]);
        }

        println!("{table}");
        Ok(())
    }

    fn render_status(
        &self,
        state: Option<UpdaterState>,
        record: &PersistedUpdateRecord,
    ) -> io::Result<()> {
        let mut table = self.new_table();
        table.set_header(vec![
            Cell::new("Key").add_attribute(Attribute::Bold),
            Cell::new("Value").add_attribute(Attribute::Bold),
        ]);

        let state_cell = match state {
            Some(state) => self.state_cell(state),
            None => Cell::new(&record.update_state).fg(Color::DarkGrey),
        };
        table.add_row(vec![Cell::new("update_state"), state_cell]);
        table.add_row(vec![Cell::new("engine_state"), Cell::new(&record.engine_state)]);
        table.add_row(vec![
            Cell::new("engine_error_state"),
            Cell::new(&record.engine_error_state),
        ]);
        let file_path = if record.file_path.is_empty() {
            "-"
        } else {
            record.file_path.as_str()
        };
        table.add_row(vec![Cell::new("file_path"), Cell::new(file_path)]);

        println!("{table}");
        Ok(())
    }

    fn render_update(
        &self,
        device: &str,
        build_time: i64,
        update: Option<&AvailableUpdate>,
    ) -> io::Result<()> {
        let Some(update) = update else {
            return self.render_success_message(&format!(
                "{device} is up to date (build time {build_time})"
            ));
        };

        println!("{}", self.style_bold(&format!("Update available for {device}")));
        let mut table = self.new_table();
        table.set_header(vec![
            Cell::new("Field").add_attribute(Attribute::Bold),
            Cell::new("Value").add_attribute(Attribute::Bold),
        ]);
        table.add_row(vec![Cell::new("Version"), Cell::new(&update.version)]);
        table.add_row(vec![Cell::new("Build"), Cell::new(&update.id)]);
        if !update.date.is_empty() {
            table.add_row(vec![Cell::new("Date"), Cell::new(&update.date)]);
        }
        if !update.android_spl.is_empty() {
            table.add_row(vec![
                Cell::new("Security patch"),
                Cell::new(&update.android_spl),
            ]);
        }
        table.add_row(vec![Cell::new("File"), Cell::new(&update.filename)]);
        table.add_row(vec![Cell::new("Size"), Cell::new(update.size.to_string())]);
        println!("{table}");
        Ok(())
    }

    fn render_packages(&self, dir: &std::path::Path, packages: &[PackageFile]) -> io::Result<()> {
        if packages.is_empty() {
            println!("No packages in {}", dir.display());
            return Ok(());
        }

        let mut table = self.new_table();
        table.set_header(vec![
            Cell::new("Package").add_attribute(Attribute::Bold),
            Cell::new("Size").add_attribute(Attribute::Bold),
        ]);
        for package in packages {
            table.add_row(vec![
                Cell::new(package.path.display()),
                Cell::new(package.size.to_string()),
            ]);
        }
        println!("{table}");
        Ok(())
    }

    fn render_success_message(&self, message: &str) -> io::Result<()> {
        let line = if self.colors_enabled() {
            Style::new().green().apply_to(message).to_string()
        } else {
            message.to_string()
        };
        self.term.write_line(&line)
    }

    fn new_table(&self) -> Table {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);
        table
    }

    fn state_cell(&self, state: UpdaterState) -> Cell {
        let cell = Cell::new(state.record_text());
        if !self.colors_enabled() {
            return cell;
        }
        match state {
            UpdaterState::Idle => cell.fg(Color::Green),
            UpdaterState::Running | UpdaterState::Paused => cell.fg(Color::Cyan),
            UpdaterState::SlotSwitchRequired | UpdaterState::RebootRequired => {
                cell.fg(Color::Yellow)
            }
            UpdaterState::Error => cell.fg(Color::Red).add_attribute(Attribute::Bold),
        }
    }

    fn style_bold(&self, text: &str) -> String {
        if self.colors_enabled() {
            Style::new().bold().apply_to(text).to_string()
        } else {
            text.to_string()
        }
    }

    fn colors_enabled(&self) -> bool {
        match self.color_choice {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => self.term.features().colors_supported(),
        }
    }
}

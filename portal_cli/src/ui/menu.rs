//! The interactive menu: create, manage and connect to profiles.

use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};

use portal_core::storage::validate_ipv4;
use portal_core::{ConnectionProfile, KeyKind, Mutation, ProfileEdit, StoreError};

use super::session;
use super::App;

const RULE: &str = "    ==========================================";
const BLANK: &str = "    |                                         |";

pub fn section_header(title: &str) -> String {
    format!("\n{RULE}\n{BLANK}\n    |{title:^41}|\n{BLANK}\n{RULE}\n\n")
}

/// Renders profiles as the numbered table shown by "List all connections".
pub fn connection_table(profiles: &BTreeMap<String, ConnectionProfile>) -> String {
    let mut out = format!(
        "{:<5}|    {:<20}  |   {:<15}  |   {:<10}\n{}\n",
        "No.",
        "Name",
        "IP Address",
        "Username",
        "-".repeat(70)
    );
    for (i, (name, profile)) in profiles.iter().enumerate() {
        out.push_str(&format!(
            "{:<3}  |   {:<20}   |   {:<15}  |   {:<10}\n",
            i + 1,
            name,
            profile.address,
            profile.username
        ));
    }
    out
}

/// Line-oriented question/answer over any reader and writer.
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Prints `label` and reads one line. `None` means end of input.
    pub fn ask(&mut self, label: &str) -> io::Result<Option<String>> {
        write!(self.output, "{label}")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    pub fn say(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.output, "{text}")
    }

    fn confirm(&mut self, label: &str) -> io::Result<Option<bool>> {
        Ok(self.ask(label)?.map(|a| a.trim().eq_ignore_ascii_case("y")))
    }

    fn ask_address(&mut self, label: &str) -> io::Result<Option<String>> {
        loop {
            let Some(address) = self.ask(label)? else {
                return Ok(None);
            };
            if validate_ipv4(&address) {
                return Ok(Some(address));
            }
            self.say("Invalid IPv4 address format. Please try again.")?;
        }
    }

    /// Like [`ask_address`](Self::ask_address), but a blank answer is
    /// accepted as `Some(None)`: keep the current address.
    fn ask_address_change(&mut self, label: &str) -> io::Result<Option<Option<String>>> {
        loop {
            let Some(address) = self.ask(label)? else {
                return Ok(None);
            };
            if address.trim().is_empty() {
                return Ok(Some(None));
            }
            if validate_ipv4(&address) {
                return Ok(Some(Some(address)));
            }
            self.say("Invalid IPv4 address format. Please try again.")?;
        }
    }

    /// A blank answer is `Some(None)`: keep the current key kind.
    fn ask_key_kind_change(&mut self, label: &str) -> io::Result<Option<Option<KeyKind>>> {
        loop {
            let Some(raw) = self.ask(label)? else {
                return Ok(None);
            };
            match KeyKind::parse_change(&raw) {
                Ok(change) => return Ok(Some(change)),
                Err(e) => self.say(&format!("{e}. Please try again."))?,
            }
        }
    }

    fn ask_key_kind(&mut self, label: &str) -> io::Result<Option<KeyKind>> {
        loop {
            let Some(raw) = self.ask(label)? else {
                return Ok(None);
            };
            match raw.parse::<KeyKind>() {
                Ok(kind) => return Ok(Some(kind)),
                Err(e) => self.say(&format!("{e}. Please try again."))?,
            }
        }
    }
}

pub struct Menu<R, W> {
    app: App,
    io: Prompter<R, W>,
}

impl<R: BufRead, W: Write> Menu<R, W> {
    pub fn new(app: App, input: R, output: W) -> Self {
        Self {
            app,
            io: Prompter::new(input, output),
        }
    }

    /// Shows the main menu until the user exits or input ends.
    pub fn show(&mut self) -> anyhow::Result<()> {
        self.io.say(&section_header("Welcome to SSH Portal"))?;
        self.io.say("\nPlease choose an option:\n")?;
        loop {
            self.io.say("[1]   Create a new SSH connection")?;
            self.io.say("[2]   Manage existing SSH connections")?;
            self.io.say("[3]   Connect to a machine via SSH")?;
            self.io.say("[4]   Exit")?;
            let Some(choice) = self.io.ask("Enter your choice: ")? else {
                return Ok(());
            };
            match choice.trim() {
                "1" => self.create_connection()?,
                "2" => self.manage_connections()?,
                "3" => self.connect()?,
                "4" => {
                    self.io.say("\nExiting the program...")?;
                    self.io.say("\nGoodbye!\n")?;
                    return Ok(());
                }
                _ => self.io.say("Invalid choice. Please try again.\n")?,
            }
        }
    }

    fn create_connection(&mut self) -> anyhow::Result<()> {
        let name = loop {
            let Some(name) = self.io.ask("Enter Name for your SSH Connection: ")? else {
                return Ok(());
            };
            if !name.trim().is_empty() {
                break name.trim().to_string();
            }
            self.io.say("Name must not be empty.")?;
        };
        let Some(address) = self.io.ask_address("Enter IP address: ")? else {
            return Ok(());
        };
        let Some(username) = self.io.ask("Enter username for login: ")? else {
            return Ok(());
        };
        let Some(credential) = self.io.ask("Enter password or path to SSH key: ")? else {
            return Ok(());
        };
        let Some(key_kind) = self
            .io
            .ask_key_kind("Enter key type (pem, rsa, dsa, ed25519) or leave blank for password: ")?
        else {
            return Ok(());
        };

        match self
            .app
            .store
            .create(&name, &address, &username, &credential, key_kind)
        {
            Ok(()) => self
                .io
                .say(&format!("New Connection {name} created successfully.\n"))?,
            Err(e) => self.report_store_error(e)?,
        }
        Ok(())
    }

    fn manage_connections(&mut self) -> anyhow::Result<()> {
        loop {
            self.io.say(&section_header("Manage SSH Connections"))?;
            self.io.say("[1]   List all connections")?;
            self.io.say("[2]   Edit a connection")?;
            self.io.say("[3]   Delete a connection")?;
            self.io.say("[4]   Back to main menu")?;
            let Some(choice) = self.io.ask("Enter your choice: ")? else {
                return Ok(());
            };
            match choice.trim() {
                "1" => self.list_connections()?,
                "2" => self.edit_connection()?,
                "3" => self.delete_connection()?,
                "4" => return Ok(()),
                _ => self.io.say("Invalid choice. Please try again.\n")?,
            }
        }
    }

    fn list_connections(&mut self) -> anyhow::Result<()> {
        let profiles = self.app.store.list();
        if profiles.is_empty() {
            self.io.say("No connections found.")?;
            return Ok(());
        }
        let table = connection_table(profiles);
        self.io.say(&section_header("Available Connections"))?;
        self.io.say(&table)?;
        Ok(())
    }

    fn edit_connection(&mut self) -> anyhow::Result<()> {
        let Some(name) = self.pick_profile("Edit Connection", "edit")? else {
            return Ok(());
        };
        let Some(current) = self.app.store.get(&name).cloned() else {
            return Ok(());
        };
        self.io.say(&format!("Editing connection: {name}"))?;

        let mut edit = ProfileEdit::default();
        let question = |what: &str, value: &str| {
            format!("Current {what} is {value}. Do you want to change it? (y/n): ")
        };

        match self.io.confirm(&question("IP address", &current.address))? {
            Some(true) => match self
                .io
                .ask_address_change("Enter new IP address (blank keeps it): ")?
            {
                Some(address) => edit.address = address,
                None => return Ok(()),
            },
            Some(false) => {}
            None => return Ok(()),
        }
        match self.io.confirm(&question("username", &current.username))? {
            Some(true) => edit.username = self.io.ask("Enter new username: ")?,
            Some(false) => {}
            None => return Ok(()),
        }
        match self
            .io
            .confirm(&question("password or key path", &current.credential))?
        {
            Some(true) => {
                edit.credential = self.io.ask("Enter new password or path to SSH key: ")?
            }
            Some(false) => {}
            None => return Ok(()),
        }
        match self
            .io
            .confirm(&question("key type", current.key_kind.as_str()))?
        {
            Some(true) => match self
                .io
                .ask_key_kind_change("Enter new key type (none, pem, rsa, dsa, ed25519): ")?
            {
                Some(key_kind) => edit.key_kind = key_kind,
                None => return Ok(()),
            },
            Some(false) => {}
            None => return Ok(()),
        }

        match self.app.store.edit(&name, &edit) {
            Ok(Mutation::Applied) => self
                .io
                .say(&format!("\nConnection {name} updated successfully.\n"))?,
            Ok(Mutation::NotFound) => self.io.say(&format!("Connection {name} not found."))?,
            Err(e) => self.report_store_error(e)?,
        }
        Ok(())
    }

    fn delete_connection(&mut self) -> anyhow::Result<()> {
        let Some(name) = self.pick_profile("Delete Connection", "delete")? else {
            return Ok(());
        };
        match self.app.store.delete(&name) {
            Ok(Mutation::Applied) => self
                .io
                .say(&format!("\nConnection {name} deleted successfully.\n"))?,
            Ok(Mutation::NotFound) => self.io.say(&format!("Connection {name} not found."))?,
            Err(e) => self.report_store_error(e)?,
        }
        Ok(())
    }

    fn connect(&mut self) -> anyhow::Result<()> {
        let Some(name) = self.pick_profile("Available Connections", "use")? else {
            return Ok(());
        };
        let Some(profile) = self.app.store.get(&name).cloned() else {
            return Ok(());
        };
        self.io.say(&section_header("Connect to VM"))?;
        self.io.output.flush()?;

        session::countdown(&self.app, &profile);
        session::run_session(&self.app, &name, &profile);
        Ok(())
    }

    /// Numbered picker with `[0] Back`. `None` when the user backs out or
    /// the answer is not a listed number.
    fn pick_profile(&mut self, title: &str, verb: &str) -> anyhow::Result<Option<String>> {
        let names: Vec<String> = self.app.store.list().keys().cloned().collect();
        if names.is_empty() {
            self.io.say("No connections found.")?;
            return Ok(None);
        }

        self.io.say(&section_header(title))?;
        self.io.say("[0] Back")?;
        for (i, name) in names.iter().enumerate() {
            self.io.say(&format!("[{}] {}", i + 1, name))?;
        }

        let label = format!("Enter the number of the connection to {verb}: ");
        let Some(answer) = self.io.ask(&label)? else {
            return Ok(None);
        };
        match answer.trim().parse::<usize>() {
            Ok(0) => Ok(None),
            Ok(n) if n <= names.len() => Ok(Some(names[n - 1].clone())),
            Ok(_) => {
                self.io.say("Invalid choice. Please try again.")?;
                Ok(None)
            }
            Err(_) => {
                self.io.say("Invalid input. Please enter a number.")?;
                Ok(None)
            }
        }
    }

    /// Store errors are shown and the menu carries on.
    fn report_store_error(&mut self, e: StoreError) -> io::Result<()> {
        self.io.say(&format!("Error: {e}"))
    }
}

//! Interactive Menu Loop
//!
//! The operator drives every operation through a numbered menu. Each pass
//! prints the menu, reads a selection, prompts for the operation's inputs,
//! performs one store round trip, and prints the outcome.
//!
//! # Error Policy
//! Operation errors are printed and the loop continues. Two conditions
//! bubble out instead: a fatal error (lost connection, nothing left to
//! serve) and a failed terminal read (`Prompt`, e.g. stdin closed), since
//! re-prompting would spin forever.

use dialoguer::Input;

use crate::error::{CarddexError, Result};
use crate::store::ContactStore;

const MENU: &str = "
    1 - List all contacts    |  2 - Add a contact
    ------------------------------------------------
    3 - Update a contact     |  4 - Delete a contact
    ------------------------------------------------
    5 - Search by name       |  6 - Search by tag
    ------------------------------------------------
    0 - Exit
";

/// Run the menu loop until the operator exits.
pub async fn run<S: ContactStore>(store: &mut S) -> Result<()> {
    loop {
        println!("{MENU}");
        let selection = prompt_text("Select an action", false)?;

        let outcome = match selection.trim() {
            "1" => list(store).await,
            "2" => add(store).await,
            "3" => update(store).await,
            "4" => delete(store).await,
            "5" => search_by_name(store).await,
            "6" => search_by_tag(store).await,
            "0" => {
                println!("Goodbye!");
                return Ok(());
            }
            _ => {
                println!("Invalid selection, try again.");
                continue;
            }
        };

        if let Err(err) = outcome {
            if err.is_fatal() || matches!(err, CarddexError::Prompt(_)) {
                return Err(err);
            }
            println!("{err}");
        }
    }
}

async fn list<S: ContactStore>(store: &mut S) -> Result<()> {
    let records = store.list().await?;

    if records.is_empty() {
        println!("The phone book is empty!");
        return Ok(());
    }

    println!("All contacts:");
    for record in records {
        match &record.tags {
            Some(tags) => println!(
                "ID: {} | Name: {} | Phone: {} | Tags: {tags}",
                record.id, record.name, record.phone
            ),
            None => println!("ID: {} | Name: {} | Phone: {}", record.id, record.name, record.phone),
        }
    }
    Ok(())
}

async fn add<S: ContactStore>(store: &mut S) -> Result<()> {
    let name = prompt_text("Name", true)?;
    let phone = prompt_text("Phone number", true)?;
    let label = prompt_text("Tag (leave empty to skip)", true)?;

    let contact = store.add(name.trim(), phone.trim()).await?;
    println!("Added contact '{}' with id {}.", contact.name, contact.id);

    // The contact is already committed; a tagging failure is reported and
    // never rolls it back.
    let label = label.trim();
    if !label.is_empty() {
        match store.tag(contact.id, label).await {
            Ok(_) => println!("Tagged '{}' as '{label}'.", contact.name),
            Err(err) => println!("Contact was saved, but tagging failed: {err}"),
        }
    }
    Ok(())
}

async fn update<S: ContactStore>(store: &mut S) -> Result<()> {
    let id = prompt_id("Id of the contact to update")?;
    let name = prompt_text("New name", true)?;
    let phone = prompt_text("New phone number", true)?;

    store.update(id, name.trim(), phone.trim()).await?;
    println!("Contact {id} updated.");
    Ok(())
}

async fn delete<S: ContactStore>(store: &mut S) -> Result<()> {
    let id = prompt_id("Id of the contact to delete")?;

    store.delete(id).await?;
    println!("Contact {id} deleted.");
    Ok(())
}

async fn search_by_name<S: ContactStore>(store: &mut S) -> Result<()> {
    let name = prompt_text("Name to search for", true)?;

    let contacts = store.search_by_name(name.trim()).await?;
    if contacts.is_empty() {
        println!("No contact with that name was found.");
        return Ok(());
    }

    for contact in contacts {
        println!("Found contact: {}, {}, ID: {}", contact.name, contact.phone, contact.id);
    }
    Ok(())
}

async fn search_by_tag<S: ContactStore>(store: &mut S) -> Result<()> {
    let label = prompt_text("Tag to search for", true)?;

    let matches = store.search_by_tag(label.trim()).await?;
    if matches.is_empty() {
        println!("No contacts carry tag '{}'.", label.trim());
        return Ok(());
    }

    for (name, phone) in matches {
        println!("{name}: {phone}");
    }
    Ok(())
}

fn prompt_text(label: &str, allow_empty: bool) -> Result<String> {
    Input::new()
        .with_prompt(label)
        .allow_empty(allow_empty)
        .interact_text()
        .map_err(|e| CarddexError::prompt(e.to_string()))
}

fn prompt_id(label: &str) -> Result<i32> {
    Input::new()
        .with_prompt(label)
        .interact_text()
        .map_err(|e| CarddexError::prompt(e.to_string()))
}

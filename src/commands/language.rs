use anyhow::Result;

use crate::commands::{open_store, with_store};
use crate::config::Config;
use crate::language::{new_language_for, NewLanguage};

#[derive(Debug, Clone)]
pub enum LanguageAction {
    List,
    Add {
        code: String,
        locale: Option<String>,
        name: Option<String>,
        native_name: Option<String>,
        rtl: bool,
    },
    SetDefault(String),
    SetFallback(String),
    Toggle(String),
    Delete(String),
}

pub fn run(config: &Config, action: LanguageAction) -> Result<()> {
    if let LanguageAction::List = action {
        let store = open_store(config)?;
        for lang in store.registry().list() {
            let mut flags = Vec::new();
            if lang.is_default {
                flags.push("default");
            }
            if lang.is_fallback {
                flags.push("fallback");
            }
            if lang.is_rtl {
                flags.push("rtl");
            }
            if !lang.is_active {
                flags.push("inactive");
            }
            println!(
                "{:<8} {:<10} {} / {}  [{}]",
                lang.code,
                lang.locale,
                lang.name,
                lang.native_name,
                flags.join(", ")
            );
        }
        return Ok(());
    }

    with_store(config, |store| {
        match action {
            LanguageAction::List => {}
            LanguageAction::Add {
                code,
                locale,
                name,
                native_name,
                rtl,
            } => {
                let base = new_language_for(&code);
                let mut new = NewLanguage::new(
                    &code,
                    locale.as_deref().unwrap_or(&base.locale),
                    name.as_deref().unwrap_or(&base.name),
                    native_name.as_deref().unwrap_or(&base.native_name),
                );
                new.is_rtl = rtl || base.is_rtl;
                store.add_language(new)?;
                println!("Added language {}", code);
            }
            LanguageAction::SetDefault(code) => {
                store.set_default_language(&code)?;
                println!("Default language is now {}", code);
            }
            LanguageAction::SetFallback(code) => {
                store.set_fallback_language(&code)?;
                println!("Fallback language is now {}", code);
            }
            LanguageAction::Toggle(code) => {
                let active = store.toggle_language(&code)?;
                println!(
                    "Language {} is now {}",
                    code,
                    if active { "active" } else { "inactive" }
                );
            }
            LanguageAction::Delete(code) => {
                let removed = store.delete_language(&code)?;
                println!("Deleted language {} ({} translation(s))", code, removed);
            }
        }
        Ok(())
    })
}

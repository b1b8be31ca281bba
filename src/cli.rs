use crate::error::Result;

pub const USAGE: &str = "\
Usage: newsdesk <command> [args]

Commands:
  feed [category]            Show a category feed (cached first, then fresh)
  refresh [category]         Drop the displayed list and reload from the backend
  more [category] [pages]    Load the feed, then page back through older articles
  cached <category>          Show what is cached for a category, without network
  show <category> <id>       Show an article in full
  search <query..>           Search all articles
  categories                 List categories and subscriptions
  toggle <code>              Subscribe to / unsubscribe from a category
  save <id> <category>       Bookmark an article
  unsave <id>                Remove a bookmark
  saved                      List bookmarked articles
  clear-cache                Remove every cached article
  reset-categories           Restore the default category list
  clear-saved                Remove every bookmark
  backend [url]              Show or set the backend URL
  help                       Show this message";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Feed { category: Option<String> },
    Refresh { category: Option<String> },
    More { category: Option<String>, pages: usize },
    Cached { category: String },
    Show { category: String, id: String },
    Search { query: String },
    Categories,
    Toggle { code: String },
    Save { id: String, category: String },
    Unsave { id: String },
    Saved,
    ClearCache,
    ResetCategories,
    ClearSaved,
    Backend { url: Option<String> },
    Help,
}

fn missing(what: &str) -> crate::error::AppError {
    anyhow::anyhow!("missing {}\n\n{}", what, USAGE).into()
}

/// Parse the arguments following the program name.
pub fn parse_args(args: &[String]) -> Result<Command> {
    let mut args = args.iter().map(String::as_str);
    let Some(command) = args.next() else {
        return Ok(Command::Feed { category: None });
    };

    let command = match command {
        "feed" => Command::Feed {
            category: args.next().map(str::to_string),
        },
        "refresh" => Command::Refresh {
            category: args.next().map(str::to_string),
        },
        "more" => {
            let category = args.next().map(str::to_string);
            let pages = match args.next() {
                Some(n) => n
                    .parse()
                    .map_err(|_| anyhow::anyhow!("invalid page count '{}'", n))?,
                None => 1,
            };
            Command::More { category, pages }
        }
        "cached" => Command::Cached {
            category: args.next().ok_or_else(|| missing("category"))?.to_string(),
        },
        "show" => {
            let category = args.next().ok_or_else(|| missing("category"))?.to_string();
            let id = args.next().ok_or_else(|| missing("article id"))?.to_string();
            Command::Show { category, id }
        }
        "search" => {
            let query = args.collect::<Vec<_>>().join(" ");
            if query.trim().is_empty() {
                return Err(missing("search query"));
            }
            Command::Search { query }
        }
        "categories" => Command::Categories,
        "toggle" => Command::Toggle {
            code: args.next().ok_or_else(|| missing("category code"))?.to_string(),
        },
        "save" => {
            let id = args.next().ok_or_else(|| missing("article id"))?.to_string();
            let category = args.next().ok_or_else(|| missing("category"))?.to_string();
            Command::Save { id, category }
        }
        "unsave" => Command::Unsave {
            id: args.next().ok_or_else(|| missing("article id"))?.to_string(),
        },
        "saved" => Command::Saved,
        "clear-cache" => Command::ClearCache,
        "reset-categories" => Command::ResetCategories,
        "clear-saved" => Command::ClearSaved,
        "backend" => Command::Backend {
            url: args.next().map(str::to_string),
        },
        "help" | "-h" | "--help" => Command::Help,
        other => return Err(anyhow::anyhow!("unknown command '{}'\n\n{}", other, USAGE).into()),
    };

    Ok(command)
}

//! Line-oriented admin shell.
//!
//! Reads one command per stdin line, dispatches it against [`App`], and
//! prints tables and notices to stdout. Logging goes to stderr so output
//! stays pipeable. Frontier rows are addressed by 1-based index, slug, or
//! raw id; mutating commands re-resolve their subject against the current
//! frontier when the line is parsed.

use std::io::Write as _;
use std::path::PathBuf;

use anyhow::Result;
use chrono::{DateTime, NaiveTime, Utc};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::api::{
    Category, CategoryDraft, CropRect, GalleryFilter, GalleryKind, GalleryStatus, NewGalleryEntry,
};
use crate::app::App;
use crate::catalog::{walk_subtree, TreeRow, DEFAULT_TREE_DEPTH};
use crate::util::{display_width, pad_to_width, strip_control_chars, truncate_to_width};

/// What the loop should do after a dispatched command.
enum Flow {
    Continue,
    Quit,
}

/// Runs the shell until `quit` or EOF. Errors out only on stdin/stdout I/O
/// failure; command failures become status notices.
pub async fn run(app: &mut App) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    print_frontier(app);
    loop {
        if let Some(notice) = app.take_status() {
            println!("* {}", strip_control_chars(&notice));
        }
        print!("{}", prompt(app));
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break; // EOF
        };
        match dispatch(app, line.trim()).await {
            Flow::Quit => break,
            Flow::Continue => {}
        }
    }
    Ok(())
}

fn prompt(app: &App) -> String {
    let trail = app.nav.trail();
    if trail.is_empty() {
        "curator:/> ".to_string()
    } else {
        let mut path = String::new();
        for name in trail {
            path.push('/');
            path.push_str(&strip_control_chars(name));
        }
        format!("curator:{path}> ")
    }
}

// ============================================================================
// Dispatch
// ============================================================================

async fn dispatch(app: &mut App, line: &str) -> Flow {
    if line.is_empty() {
        return Flow::Continue;
    }

    // An armed delete consumes the next line: y fires it, anything else
    // cancels it without being executed as a command.
    if app.has_pending_delete() {
        if matches!(line, "y" | "Y" | "yes") {
            if app.confirm_delete().await {
                print_frontier(app);
            }
        } else if let Some(subject) = app.disarm_delete() {
            app.set_status(format!("Delete of '{}' cancelled", subject.name));
        }
        return Flow::Continue;
    }

    let args = split_args(line);
    let Some(cmd) = args.first().map(String::as_str) else {
        return Flow::Continue;
    };

    match cmd {
        "help" | "?" => print_help(),
        "quit" | "exit" | "q" => return Flow::Quit,
        "ls" => print_frontier(app),
        "refresh" => {
            if app.refresh().await {
                print_frontier(app);
            }
        }
        "cd" => cmd_cd(app, &args[1..]).await,
        "back" | ".." => {
            if app.back().await {
                print_frontier(app);
            }
        }
        "show" => cmd_show(app, &args[1..]),
        "create" => cmd_create(app, &args[1..]).await,
        "insert" => cmd_insert(app, &args[1..]).await,
        "rm" => cmd_rm(app, &args[1..]),
        "tree" => cmd_tree(app, &args[1..]).await,
        "gallery" => cmd_gallery(app, &args[1..]).await,
        other => app.set_status(format!("Unknown command '{other}', try help")),
    }
    Flow::Continue
}

async fn cmd_cd(app: &mut App, args: &[String]) {
    let Some(key) = args.first() else {
        app.set_status("Usage: cd <row|slug|id>  (cd .. goes up)");
        return;
    };
    if key == ".." {
        if app.back().await {
            print_frontier(app);
        }
        return;
    }
    let Some(subject) = app.resolve_subject(key) else {
        app.set_status(format!("No category '{key}' in the current view"));
        return;
    };
    let id = subject.id.clone();
    if app.drill(&id).await {
        print_frontier(app);
    }
}

fn cmd_show(app: &mut App, args: &[String]) {
    let Some(key) = args.first() else {
        app.set_status("Usage: show <row|slug|id>");
        return;
    };
    let Some(subject) = app.resolve_subject(key) else {
        app.set_status(format!("No category '{key}' in the current view"));
        return;
    };
    println!("Name:        {}", strip_control_chars(&subject.name));
    println!("Slug:        {}", strip_control_chars(&subject.slug));
    println!("Id:          {}", strip_control_chars(subject.id.as_str()));
    println!("Level:       {}", subject.level);
    if let Some(parent) = &subject.parent_id {
        println!("Parent:      {}", strip_control_chars(parent.as_str()));
    }
    if let Some(desc) = &subject.description {
        println!("Description: {}", strip_control_chars(desc));
    }
    if let Some(uri) = &subject.image_uri {
        println!("Image:       {}", strip_control_chars(uri));
    }
}

async fn cmd_create(app: &mut App, args: &[String]) {
    const USAGE: &str = "Usage: create <subject> name=\"...\" [desc=\"...\"] [image=<uri>]";
    let Some(key) = args.first() else {
        app.set_status(USAGE);
        return;
    };
    let Some(subject) = app.resolve_subject(key).cloned() else {
        app.set_status(format!("No category '{key}' in the current view"));
        return;
    };
    let mut draft = CategoryDraft::default();
    for token in &args[1..] {
        match parse_kv(token) {
            Some(("name", v)) => draft.name = v.to_owned(),
            Some(("desc" | "description", v)) => draft.description = Some(v.to_owned()),
            Some(("image", v)) => draft.image_uri = Some(v.to_owned()),
            _ => {
                app.set_status(format!("Unrecognized argument '{token}'. {USAGE}"));
                return;
            }
        }
    }
    if draft.name.is_empty() {
        app.set_status(USAGE);
        return;
    }
    if app.create_category(&subject, &draft).await {
        print_frontier(app);
    }
}

async fn cmd_insert(app: &mut App, args: &[String]) {
    const USAGE: &str = "Usage: insert <subject> child=<slug|id> name=\"...\" [desc=\"...\"] [image=<uri>]";
    let Some(key) = args.first() else {
        app.set_status(USAGE);
        return;
    };
    let Some(subject) = app.resolve_subject(key).cloned() else {
        app.set_status(format!("No category '{key}' in the current view"));
        return;
    };
    let mut draft = CategoryDraft::default();
    let mut child_key: Option<String> = None;
    for token in &args[1..] {
        match parse_kv(token) {
            Some(("child", v)) => child_key = Some(v.to_owned()),
            Some(("name", v)) => draft.name = v.to_owned(),
            Some(("desc" | "description", v)) => draft.description = Some(v.to_owned()),
            Some(("image", v)) => draft.image_uri = Some(v.to_owned()),
            _ => {
                app.set_status(format!("Unrecognized argument '{token}'. {USAGE}"));
                return;
            }
        }
    }

    // without child= the command lists what could be spliced over
    let Some(child_key) = child_key else {
        if let Some(rows) = app.eligible_children(&subject).await {
            if rows.is_empty() {
                app.set_status(format!("'{}' has no children to insert above", subject.name));
            } else {
                println!("Children of '{}':", strip_control_chars(&subject.name));
                print_rows(&rows);
                println!("Run: insert {key} child=<slug|id> name=\"...\"");
            }
        }
        return;
    };

    if draft.name.is_empty() {
        app.set_status(USAGE);
        return;
    }
    if app.insert_category(&subject, &draft, &child_key).await {
        print_frontier(app);
    }
}

fn cmd_rm(app: &mut App, args: &[String]) {
    let Some(key) = args.first() else {
        app.set_status("Usage: rm <row|slug|id>");
        return;
    };
    match app.resolve_subject(key).cloned() {
        Some(subject) => app.arm_delete(subject),
        None => app.set_status(format!("No category '{key}' in the current view")),
    }
}

async fn cmd_tree(app: &mut App, args: &[String]) {
    let mut start = app.nav.current_parent().cloned();
    let mut depth = DEFAULT_TREE_DEPTH;
    for token in args {
        if let Some(("depth", v)) = parse_kv(token) {
            match v.parse::<usize>() {
                Ok(d) if d >= 1 => depth = d.min(8),
                _ => {
                    app.set_status("depth must be a number between 1 and 8");
                    return;
                }
            }
        } else {
            match app.resolve_subject(token) {
                Some(subject) => start = Some(subject.id.clone()),
                None => {
                    app.set_status(format!("No category '{token}' in the current view"));
                    return;
                }
            }
        }
    }
    match walk_subtree(&app.api, start.as_ref(), depth).await {
        Ok(rows) => print_tree(&rows),
        Err(e) => app.set_status(format!("Tree listing failed: {e}")),
    }
}

// ============================================================================
// Gallery commands
// ============================================================================

async fn cmd_gallery(app: &mut App, args: &[String]) {
    match args.first().map(String::as_str) {
        None => {
            if app.gallery_fetch().await {
                print_gallery(app);
            }
        }
        Some("next") => {
            if app.gallery_next().await {
                print_gallery(app);
            }
        }
        Some("prev") => {
            if app.gallery_prev().await {
                print_gallery(app);
            }
        }
        Some("filter") => cmd_gallery_filter(app, &args[1..]).await,
        Some("add") => cmd_gallery_add(app, &args[1..]).await,
        Some("upload") => cmd_gallery_upload(app, &args[1..]).await,
        Some(other) => {
            app.set_status(format!("Unknown gallery subcommand '{other}', try help"))
        }
    }
}

async fn cmd_gallery_filter(app: &mut App, args: &[String]) {
    const USAGE: &str =
        "Usage: gallery filter [type=<category|banner|card>] [ratio=<r>] [status=<upcoming|ongoing|expired>] [kw=<word>] | gallery filter clear";
    if args.is_empty() {
        app.set_status(USAGE);
        return;
    }
    if args.len() == 1 && args[0] == "clear" {
        app.gallery.set_filter(GalleryFilter::default());
    } else {
        let mut filter = app.gallery.filter.clone();
        for token in args {
            match parse_kv(token) {
                Some(("type", v)) => match v.parse::<GalleryKind>() {
                    Ok(kind) => filter.kind = Some(kind),
                    Err(e) => {
                        app.set_status(e);
                        return;
                    }
                },
                Some(("status", v)) => match v.parse::<GalleryStatus>() {
                    Ok(status) => filter.status = Some(status),
                    Err(e) => {
                        app.set_status(e);
                        return;
                    }
                },
                Some(("ratio", v)) => filter.ratio = Some(v.to_owned()),
                Some(("kw" | "keyword", v)) => filter.keyword = Some(v.to_owned()),
                _ => {
                    app.set_status(format!("Unrecognized argument '{token}'. {USAGE}"));
                    return;
                }
            }
        }
        app.gallery.set_filter(filter);
    }
    if app.gallery_fetch().await {
        print_gallery(app);
    }
}

async fn cmd_gallery_add(app: &mut App, args: &[String]) {
    const USAGE: &str = "Usage: gallery add image=<uri> type=<kind> path=<link> ratio=<r> start=<date> end=<date>";
    let mut image = None;
    let mut kind = None;
    let mut link = None;
    let mut ratio = None;
    let mut start = None;
    let mut end = None;
    for token in args {
        let parsed = match parse_kv(token) {
            Some(("image", v)) => {
                image = Some(v.to_owned());
                Ok(())
            }
            Some(("type", v)) => v.parse::<GalleryKind>().map(|k| kind = Some(k)),
            Some(("path", v)) => {
                link = Some(v.to_owned());
                Ok(())
            }
            Some(("ratio", v)) => {
                ratio = Some(v.to_owned());
                Ok(())
            }
            Some(("start", v)) => parse_date(v, false).map(|d| start = Some(d)),
            Some(("end", v)) => parse_date(v, true).map(|d| end = Some(d)),
            _ => Err(format!("Unrecognized argument '{token}'. {USAGE}")),
        };
        if let Err(e) = parsed {
            app.set_status(e);
            return;
        }
    }
    let (Some(image_uri), Some(kind), Some(path), Some(ratio), Some(start_date), Some(end_date)) =
        (image, kind, link, ratio, start, end)
    else {
        app.set_status(USAGE);
        return;
    };
    if end_date < start_date {
        app.set_status("End date precedes start date");
        return;
    }
    app.gallery_create(NewGalleryEntry {
        image_uri,
        kind,
        path,
        ratio,
        start_date,
        end_date,
    })
    .await;
}

async fn cmd_gallery_upload(app: &mut App, args: &[String]) {
    const USAGE: &str = "Usage: gallery upload <file> [ratio=<r>] [crop=x,y,w,h]";
    let Some(file) = args.first() else {
        app.set_status(USAGE);
        return;
    };
    let mut ratio: Option<String> = None;
    let mut crop: Option<CropRect> = None;
    for token in &args[1..] {
        match parse_kv(token) {
            Some(("ratio", v)) => ratio = Some(v.to_owned()),
            Some(("crop", v)) => match v.parse::<CropRect>() {
                Ok(rect) => crop = Some(rect),
                Err(e) => {
                    app.set_status(e);
                    return;
                }
            },
            _ => {
                app.set_status(format!("Unrecognized argument '{token}'. {USAGE}"));
                return;
            }
        }
    }
    let path = PathBuf::from(file);
    if let Some(uri) = app.gallery_upload(&path, ratio.as_deref(), crop).await {
        println!("image_uri: {uri}");
        println!("Attach it with: gallery add image={uri} ...");
    }
}

// ============================================================================
// Parsing helpers
// ============================================================================

/// Splits a command line into tokens. Double quotes group words, may start
/// mid-token (name="Two Words"), and do not nest; an unclosed quote runs to
/// the end of the line.
fn split_args(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for ch in line.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Splits a `key=value` token at the first `=`.
fn parse_kv(token: &str) -> Option<(&str, &str)> {
    token.split_once('=')
}

/// Parses `YYYY-MM-DD` (midnight UTC, or 23:59:59 for range ends) or a full
/// RFC 3339 timestamp.
fn parse_date(raw: &str, end_of_day: bool) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    let date = chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| format!("'{raw}' is not a date (use YYYY-MM-DD or RFC 3339)"))?;
    let mut naive = date.and_time(NaiveTime::MIN);
    if end_of_day {
        naive = naive
            .checked_add_signed(chrono::Duration::seconds(86_399))
            .ok_or_else(|| format!("'{raw}' is out of range"))?;
    }
    Ok(DateTime::from_naive_utc_and_offset(naive, Utc))
}

// ============================================================================
// Output
// ============================================================================

fn print_help() {
    println!("Catalog:");
    println!("  ls                         list the current view");
    println!("  cd <row|slug|id>           descend into a category (cd .. goes up)");
    println!("  back                       go up one level");
    println!("  show <subject>             print one category in full");
    println!("  refresh                    refetch the current view");
    println!("  tree [subject] [depth=N]   list the subtree (default depth {DEFAULT_TREE_DEPTH})");
    println!("  create <subject> name=\"...\" [desc=\"...\"] [image=<uri>]");
    println!("                             add a child under <subject>");
    println!("  insert <subject>           list children eligible for splicing");
    println!("  insert <subject> child=<slug|id> name=\"...\"");
    println!("                             splice a new category above that child");
    println!("  rm <subject>               delete (asks for y confirmation)");
    println!();
    println!("Gallery:");
    println!("  gallery                    show the current page");
    println!("  gallery next | prev        page through results");
    println!("  gallery filter type=banner ratio=16:9 status=ongoing kw=sale");
    println!("  gallery filter clear       drop all filters");
    println!("  gallery upload <file> [ratio=<r>] [crop=x,y,w,h]");
    println!("  gallery add image=<uri> type=<kind> path=<link> ratio=<r> start=<date> end=<date>");
    println!();
    println!("  help                       this text");
    println!("  quit                       leave the shell");
    println!();
    println!("Subjects are row numbers from ls, slugs, or raw ids; numbers win.");
}

fn print_frontier(app: &App) {
    let rows = app.nav.frontier();
    if rows.is_empty() {
        println!("(no categories here)");
        return;
    }
    print_rows(rows);
}

fn print_rows(rows: &[Category]) {
    let name_w = column_width(rows.iter().map(|c| c.name.as_str()), 4, 32);
    let slug_w = column_width(rows.iter().map(|c| c.slug.as_str()), 4, 24);

    println!(
        "{} {} {} {}  ID",
        pad_to_width("#", 3),
        pad_to_width("NAME", name_w),
        pad_to_width("SLUG", slug_w),
        "LVL",
    );
    for (i, c) in rows.iter().enumerate() {
        let name = strip_control_chars(&c.name);
        let slug = strip_control_chars(&c.slug);
        println!(
            "{} {} {} {:<3}  {}",
            pad_to_width(&format!("{}", i + 1), 3),
            pad_to_width(&truncate_to_width(&name, name_w), name_w),
            pad_to_width(&truncate_to_width(&slug, slug_w), slug_w),
            c.level,
            strip_control_chars(c.id.as_str()),
        );
    }
}

/// Widest sanitized cell, clamped so one long name cannot blow the table up.
fn column_width<'a>(cells: impl Iterator<Item = &'a str>, min: usize, max: usize) -> usize {
    cells
        .map(|s| display_width(&strip_control_chars(s)))
        .max()
        .unwrap_or(min)
        .clamp(min, max)
}

fn print_tree(rows: &[TreeRow]) {
    if rows.is_empty() {
        println!("(empty subtree)");
        return;
    }
    for row in rows {
        let name = strip_control_chars(&row.node.name);
        let slug = strip_control_chars(&row.node.slug);
        println!("{}{} ({})", "  ".repeat(row.depth), name, slug);
    }
}

fn print_gallery(app: &App) {
    let browser = &app.gallery;
    if browser.rows().is_empty() {
        println!("(no gallery entries match)");
    } else {
        println!(
            "{} {} {} {} {}  URI",
            pad_to_width("#", 3),
            pad_to_width("TYPE", 8),
            pad_to_width("RATIO", 6),
            pad_to_width("STATUS", 8),
            pad_to_width("RUNS", 23),
        );
        for (i, img) in browser.rows().iter().enumerate() {
            let window = match (&img.start_date, &img.end_date) {
                (Some(a), Some(b)) => format!("{} - {}", a.format("%Y-%m-%d"), b.format("%Y-%m-%d")),
                (Some(a), None) => format!("{} -", a.format("%Y-%m-%d")),
                (None, Some(b)) => format!("- {}", b.format("%Y-%m-%d")),
                (None, None) => "-".to_string(),
            };
            let uri = strip_control_chars(&img.image_uri);
            println!(
                "{} {} {} {} {}  {}",
                pad_to_width(&format!("{}", i + 1), 3),
                pad_to_width(&img.kind.to_string(), 8),
                pad_to_width(&strip_control_chars(&img.ratio), 6),
                pad_to_width(&img.status.to_string(), 8),
                pad_to_width(&window, 23),
                truncate_to_width(&uri, 48),
            );
        }
    }
    let filter = &browser.filter;
    if filter.is_empty() {
        println!("Page {} of {}", browser.page(), browser.total_pages());
    } else {
        let mut parts = Vec::new();
        if let Some(kind) = filter.kind {
            parts.push(format!("type={kind}"));
        }
        if let Some(ratio) = &filter.ratio {
            parts.push(format!("ratio={}", strip_control_chars(ratio)));
        }
        if let Some(status) = filter.status {
            parts.push(format!("status={status}"));
        }
        if let Some(kw) = &filter.keyword {
            parts.push(format!("kw={}", strip_control_chars(kw)));
        }
        println!(
            "Page {} of {} (filter: {})",
            browser.page(),
            browser.total_pages(),
            parts.join(" ")
        );
    }
}

use crate::access::{decide, guard_route, Action, Gate, Outcome, RouteGuard};
use crate::activity::ActivityLog;
use crate::admin::{images, moderation, stats, upload::UploadQueue, Dashboard, Tab};
use crate::comments::{relative_time, CommentBoard, PostResult};
use crate::config::Config;
use crate::detail::{self, Engagement};
use crate::gallery::{format_count, long_date, short_date, Catalog, Category, Filter, Pager, Quality};
use crate::routes::Route;
use crate::session::{SessionController, SignInOutcome};
use anyhow::{anyhow, bail, Result};
use chrono::Utc;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::cell::RefCell;
use std::path::PathBuf;

pub struct Context {
    pub config: Config,
    pub client_id: String,
    pub debug: bool,
    pub session: RefCell<SessionController>,
    pub activity: RefCell<ActivityLog>,
    pub catalog: RefCell<Catalog>,
    pub comments: RefCell<CommentBoard>,
    pub engagement: RefCell<Engagement>,
    pub filter: RefCell<Filter>,
    pub pager: RefCell<Pager>,
    pub route: RefCell<Route>,
    pub dashboard: RefCell<Dashboard>,
    pub uploads: RefCell<UploadQueue>,
}

impl Context {
    pub fn new(
        config: Config,
        session: SessionController,
        activity: ActivityLog,
        client_id: String,
        debug: bool,
    ) -> Self {
        let pager = Pager::new(config.gallery.initial_page(), config.gallery.page_size());
        Self {
            client_id,
            debug,
            session: RefCell::new(session),
            activity: RefCell::new(activity),
            catalog: RefCell::new(Catalog::seeded(Utc::now())),
            comments: RefCell::new(CommentBoard::seeded()),
            engagement: RefCell::new(Engagement::new()),
            filter: RefCell::new(Filter::default()),
            pager: RefCell::new(pager),
            route: RefCell::new(Route::Home),
            dashboard: RefCell::new(Dashboard::new()),
            uploads: RefCell::new(UploadQueue::new()),
            config,
        }
    }

    fn debug(&self, msg: &str) {
        if self.debug {
            eprintln!("[DEBUG] {}", msg);
        }
    }
}

/// Run each command in order, stopping at `/exit`
pub fn run_once(ctx: &Context, commands: &[String]) -> Result<()> {
    for line in commands {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if handle_command(ctx, line) {
            break;
        }
    }
    Ok(())
}

pub fn run_repl(ctx: Context, history: Option<PathBuf>) -> Result<()> {
    let mut rl = DefaultEditor::new()?;
    if let Some(path) = &history {
        // Missing on first run
        let _ = rl.load_history(path);
    }

    println!("picsword - type /help for commands, /exit to quit");
    print_whoami(&ctx);

    loop {
        let prompt = format!("{}> ", ctx.route.borrow());
        match rl.readline(&prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                rl.add_history_entry(line)?;

                if handle_command(&ctx, line) {
                    break;
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Input error: {}", e);
                break;
            }
        }
    }

    if let Some(path) = &history {
        if let Err(e) = rl.save_history(path) {
            eprintln!("Warning: failed to save history: {}", e);
        }
    }
    Ok(())
}

/// Execute one command line. Returns true when the client should exit.
pub fn handle_command(ctx: &Context, line: &str) -> bool {
    let words = match shell_words::split(line) {
        Ok(words) => words,
        Err(e) => {
            eprintln!("Error: {}", e);
            return false;
        }
    };
    let Some((cmd, rest)) = words.split_first() else {
        return false;
    };
    ctx.debug(&format!("command {} {:?}", cmd, rest));

    // Bare paths navigate
    let result = if !COMMANDS.contains(&cmd.as_str())
        && !matches!(Route::parse(cmd), Route::NotFound(_))
    {
        navigate(ctx, cmd).map(|_| false)
    } else {
        dispatch(ctx, cmd, rest)
    };

    flush_persist_warnings(ctx);
    match result {
        Ok(exit) => exit,
        Err(e) => {
            eprintln!("Error: {}", e);
            false
        }
    }
}

const COMMANDS: &[&str] = &[
    "/exit",
    "/quit",
    "/help",
    "/whoami",
    "/signin",
    "/signout",
    "/open",
    "/gallery",
    "/more",
    "/search",
    "/category",
    "/quality",
    "/filters",
    "/unfilter",
    "/clear-filters",
    "/like",
    "/bookmark",
    "/bookmarks",
    "/download",
    "/share",
    "/comments",
    "/comment",
    "/comment-like",
    "/comment-delete",
    "/report",
    "/admin",
];

fn dispatch(ctx: &Context, cmd: &str, rest: &[String]) -> Result<bool> {
    match cmd {
        "/exit" | "/quit" => return Ok(true),
        "/help" => print_help(),
        "/whoami" => print_whoami(ctx),
        "/signin" => sign_in(ctx),
        "/signout" => sign_out(ctx),
        "/open" => {
            let path = rest.first().ok_or_else(|| anyhow!("Usage: /open <path>"))?;
            navigate(ctx, path)?;
        }
        "/gallery" => navigate(ctx, "/")?,
        "/more" => load_more(ctx),
        "/search" => {
            ctx.filter.borrow_mut().search = rest.join(" ");
            filters_changed(ctx);
        }
        "/category" => {
            let name = rest.first().map(String::as_str).unwrap_or("all");
            ctx.filter.borrow_mut().category = if name.eq_ignore_ascii_case("all") {
                None
            } else {
                Some(
                    Category::FILTERABLE
                        .into_iter()
                        .find(|c| c.as_str().eq_ignore_ascii_case(name))
                        .ok_or_else(|| anyhow!("Unknown category: {}", name))?,
                )
            };
            filters_changed(ctx);
        }
        "/quality" => {
            let name = rest.first().map(String::as_str).unwrap_or("all");
            ctx.filter.borrow_mut().quality = if name.eq_ignore_ascii_case("all") {
                None
            } else {
                Some(Quality::from_str(name).ok_or_else(|| anyhow!("Unknown quality: {}", name))?)
            };
            filters_changed(ctx);
        }
        "/filters" => print_filters(ctx),
        "/unfilter" => {
            let chip = rest.join(" ");
            if ctx.filter.borrow_mut().remove_filter(&chip) {
                filters_changed(ctx);
            } else {
                println!("No active filter: {}", chip);
            }
        }
        "/clear-filters" => {
            ctx.filter.borrow_mut().clear();
            filters_changed(ctx);
        }
        "/like" => like_image(ctx, &image_arg(ctx, rest.first())?)?,
        "/bookmark" => bookmark(ctx, &image_arg(ctx, rest.first())?)?,
        "/bookmarks" => {
            let engagement = ctx.engagement.borrow();
            let catalog = ctx.catalog.borrow();
            if engagement.bookmarks().is_empty() {
                println!("No bookmarks");
            }
            for id in engagement.bookmarks() {
                println!("  {}  {}", id, catalog.detail(id).title);
            }
        }
        "/download" => {
            let quality = rest
                .first()
                .ok_or_else(|| anyhow!("Usage: /download <low|medium|high|original> [image]"))?;
            let quality =
                Quality::from_str(quality).ok_or_else(|| anyhow!("Unknown quality: {}", quality))?;
            download(ctx, &image_arg(ctx, rest.get(1))?, quality)?;
        }
        "/share" => {
            let id = image_arg(ctx, rest.first())?;
            ctx.debug(&format!(
                "share: {}",
                decide(&ctx.session.borrow(), &Action::Share).as_str()
            ));
            let (link, notice) = detail::share(ctx.config.base_url(), &id);
            println!("{}", link);
            println!("{}", notice);
        }
        "/comments" => print_comments(ctx, &image_arg(ctx, rest.first())?),
        "/comment" => post_comment(ctx, &rest.join(" "))?,
        "/comment-like" => {
            let id = rest.first().ok_or_else(|| anyhow!("Usage: /comment-like <id>"))?;
            let outcome = ctx
                .comments
                .borrow_mut()
                .toggle_like(&mut ctx.session.borrow_mut(), id)?;
            if let Some(likes) = finish(ctx, "like_comment", outcome) {
                println!("Comment {} now has {} likes", id, likes);
            }
        }
        "/comment-delete" => {
            let id = rest.first().ok_or_else(|| anyhow!("Usage: /comment-delete <id>"))?;
            let outcome = ctx
                .comments
                .borrow_mut()
                .delete(&mut ctx.session.borrow_mut(), id)?;
            if let Some(notice) = finish(ctx, "delete_comment", outcome) {
                ctx.activity.borrow_mut().comment_delete(id);
                println!("{}", notice);
            }
        }
        "/report" => {
            let id = rest.first().ok_or_else(|| anyhow!("Usage: /report <id>"))?;
            let outcome = ctx
                .comments
                .borrow_mut()
                .report(&mut ctx.session.borrow_mut(), id)?;
            if let Some(notice) = finish(ctx, "report_comment", outcome) {
                println!("{}", notice);
            }
        }
        "/admin" => handle_admin(ctx, rest)?,
        other => bail!("Unknown command: {}. Type /help for commands.", other),
    }
    Ok(false)
}

fn print_help() {
    println!("Commands:");
    println!("  /exit                     - quit");
    println!("  /help                     - show commands");
    println!("  /whoami                   - show the current session");
    println!("  /signin | /signout        - sign in with the demo identity, or sign out");
    println!("  /open <path>              - navigate to /, /image/<id> or /admin");
    println!("Gallery:");
    println!("  /gallery                  - show the gallery");
    println!("  /more                     - load more images");
    println!("  /search <text>            - search titles, descriptions and categories");
    println!("  /category <name|all>      - filter by category");
    println!("  /quality <name|all>       - filter by available quality");
    println!("  /filters                  - show active filters");
    println!("  /unfilter <chip>          - remove one filter");
    println!("  /clear-filters            - reset all filters");
    println!("Image (defaults to the open image):");
    println!("  /like [id]  /bookmark [id]  /share [id]");
    println!("  /download <quality> [id]");
    println!("  /bookmarks                - list bookmarks");
    println!("Comments:");
    println!("  /comments [id]            - show the thread");
    println!("  /comment <text>           - post on the open image");
    println!("  /comment-like <id>  /comment-delete <id>  /report <id>");
    println!("Admin:");
    println!("  /admin [overview|images|upload|comments|settings]");
    println!("  /admin images [search]    - list images");
    println!("  /admin toggle <id>        - publish or unpublish an image");
    println!("  /admin delete <id>        - delete an image");
    println!("  /admin approve|reject|remove <comment-id>");
    println!("  /admin upload add <path|dir|glob>");
    println!("  /admin upload set <n> title|description|category <value>");
    println!("  /admin upload tag <n> <tag>  /admin upload untag <n> <k>");
    println!("  /admin upload drop <n>    /admin upload publish");
}

fn print_whoami(ctx: &Context) {
    ctx.debug(&format!("client {}", ctx.client_id));
    let session = ctx.session.borrow();
    match session.user() {
        Some(user) => println!(
            "({}) Signed in as {} <{}>{}",
            user.initial(),
            user.name,
            user.email,
            if session.is_admin() { " (admin)" } else { "" }
        ),
        None => println!("Not signed in"),
    }
    ctx.debug(&format!("admin address {}", session.admin_email()));
}

fn sign_in(ctx: &Context) {
    let outcome = ctx.session.borrow_mut().sign_in();
    report_sign_in(ctx, &outcome);
}

fn report_sign_in(ctx: &Context, outcome: &SignInOutcome) {
    match outcome {
        SignInOutcome::SignedIn => {
            let email = ctx
                .session
                .borrow()
                .user()
                .map(|u| u.email.clone())
                .unwrap_or_default();
            ctx.activity.borrow_mut().sign_in(&email);
            print_whoami(ctx);
        }
        SignInOutcome::AlreadySignedIn => print_whoami(ctx),
        SignInOutcome::Failed(e) => eprintln!("Sign-in failed: {}", e),
    }
}

fn sign_out(ctx: &Context) {
    ctx.session.borrow_mut().sign_out();
    // Likes and bookmarks belong to the signed-out user
    *ctx.engagement.borrow_mut() = Engagement::new();
    ctx.activity.borrow_mut().sign_out();
    println!("Signed out");
}

fn flush_persist_warnings(ctx: &Context) {
    for warning in ctx.session.borrow_mut().take_persist_warnings() {
        eprintln!("Warning: failed to persist session: {}", warning);
    }
}

/// Unwrap a gated outcome, reporting why it was blocked
fn finish<T>(ctx: &Context, action: &str, outcome: Outcome<T>) -> Option<T> {
    match outcome {
        Outcome::Done(value) => Some(value),
        Outcome::Blocked(Gate::Aborted(sign_in)) => {
            ctx.activity.borrow_mut().gate(action, "sign_in_required");
            println!("Please sign in to continue.");
            report_sign_in(ctx, &sign_in);
            None
        }
        Outcome::Blocked(Gate::Denied) => {
            ctx.activity.borrow_mut().gate(action, "deny");
            println!("Permission denied");
            None
        }
        Outcome::Blocked(Gate::Proceed) => None,
    }
}

fn navigate(ctx: &Context, path: &str) -> Result<()> {
    let route = Route::parse(path);
    ctx.debug(&format!("navigate {} -> {:?}", path, route));
    let guard = guard_route(&ctx.session.borrow(), &route);
    match guard {
        RouteGuard::Render => {}
        RouteGuard::Loading => return Ok(()),
        RouteGuard::SignInRequired => {
            ctx.activity.borrow_mut().gate("admin_dashboard", "sign_in_required");
            *ctx.route.borrow_mut() = route;
            println!("Sign in required");
            println!("Please sign in with an administrator account to access the dashboard.");
            return Ok(());
        }
        RouteGuard::Denied { redirect } => {
            ctx.activity.borrow_mut().gate("admin_dashboard", "deny");
            println!("Access denied: administrator account required");
            return navigate(ctx, &redirect.to_string());
        }
    }

    *ctx.route.borrow_mut() = route.clone();
    let action = match &route {
        Route::Image(_) => Action::ViewImage,
        Route::Admin => Action::AdminDashboard,
        _ => Action::ViewGallery,
    };
    ctx.debug(&format!(
        "{}: {}",
        action.name(),
        decide(&ctx.session.borrow(), &action).as_str()
    ));
    match &route {
        Route::Home => print_gallery(ctx),
        Route::Image(id) => print_image(ctx, id),
        Route::Admin => {
            ctx.dashboard.borrow_mut().open(&ctx.session.borrow());
            print_admin_tab(ctx, Tab::Overview, &[])?;
        }
        Route::NotFound(path) => println!("404: /{} could not be found", path),
    }
    Ok(())
}

fn filters_changed(ctx: &Context) {
    ctx.pager.borrow_mut().reset();
    *ctx.route.borrow_mut() = Route::Home;
    print_filters(ctx);
    print_gallery(ctx);
}

fn print_filters(ctx: &Context) {
    let filter = ctx.filter.borrow();
    if !filter.search.trim().is_empty() {
        println!("Search: {}", filter.search.trim());
    }
    let chips = filter.active_filters();
    if chips.is_empty() {
        println!("Filters: none");
    } else {
        println!("Filters: {}", chips.join(", "));
    }
}

fn print_gallery(ctx: &Context) {
    let catalog = ctx.catalog.borrow();
    let filter = ctx.filter.borrow();
    let engagement = ctx.engagement.borrow();
    let visible: Vec<_> = catalog.visible(&filter).collect();
    let pager = ctx.pager.borrow();
    let shown = pager.shown(visible.len());

    if visible.is_empty() {
        println!("No images found. Try adjusting your search or filters.");
        return;
    }
    for image in &visible[..shown] {
        println!(
            "  {:<16} {} [{}] by {} on {}  {}{} likes, {} downloads",
            image.id,
            image.title,
            image.category,
            image.uploaded_by,
            short_date(&image.uploaded_at),
            if engagement.is_liked(&image.id) { "*" } else { "" },
            format_count(image.likes),
            format_count(image.downloads),
        );
    }
    println!("Showing {} of {} images", shown, visible.len());
    if !pager.has_more() {
        println!("You've reached the end of the gallery");
    }
}

fn load_more(ctx: &Context) {
    let total = ctx.catalog.borrow().visible(&ctx.filter.borrow()).count();
    let added = ctx.pager.borrow_mut().load_more(total);
    ctx.debug(&format!("load more: {} added of {}", added, total));
    print_gallery(ctx);
}

fn print_image(ctx: &Context, id: &str) {
    let image = ctx.catalog.borrow().detail(id);
    let engagement = ctx.engagement.borrow();
    let likes = engagement.like_count(&ctx.catalog.borrow(), id);
    println!("{}", image.title);
    println!("  {}", image.description);
    println!("  Category: {}", image.category);
    println!("  Uploaded by {} on {}", image.uploaded_by, long_date(&image.uploaded_at));
    println!(
        "  {} views, {} downloads, {} likes{}{}",
        format_count(image.views()),
        format_count(image.downloads),
        format_count(likes),
        if engagement.is_liked(id) { " (liked)" } else { "" },
        if engagement.is_bookmarked(id) { " (bookmarked)" } else { "" },
    );
    if !image.tags.is_empty() {
        println!("  Tags: {}", image.tags.join(", "));
    }
    println!("  Qualities:");
    for quality in Quality::ALL {
        println!("    {:<9} {}", quality.label(), quality.resolution());
    }
    drop(engagement);
    print_comments(ctx, id);
}

/// Explicit id, else the image currently open
fn image_arg(ctx: &Context, arg: Option<&String>) -> Result<String> {
    if let Some(id) = arg {
        return Ok(id.clone());
    }
    match &*ctx.route.borrow() {
        Route::Image(id) => Ok(id.clone()),
        _ => bail!("No image open; pass an image id"),
    }
}

fn like_image(ctx: &Context, id: &str) -> Result<()> {
    let outcome = ctx.engagement.borrow_mut().toggle_like(
        &mut ctx.session.borrow_mut(),
        &mut ctx.catalog.borrow_mut(),
        id,
    )?;
    if let Some(state) = finish(ctx, "like_image", outcome) {
        println!(
            "{} {} ({} likes)",
            if state.liked { "Liked" } else { "Unliked" },
            id,
            state.likes
        );
    }
    Ok(())
}

fn bookmark(ctx: &Context, id: &str) -> Result<()> {
    let outcome = ctx
        .engagement
        .borrow_mut()
        .toggle_bookmark(&mut ctx.session.borrow_mut(), id)?;
    if let Some(notice) = finish(ctx, "bookmark", outcome) {
        println!("{}", notice);
    }
    Ok(())
}

fn download(ctx: &Context, id: &str, quality: Quality) -> Result<()> {
    let outcome = detail::download(
        &mut ctx.session.borrow_mut(),
        &ctx.catalog.borrow(),
        id,
        quality,
    )?;
    if let Some(ticket) = finish(ctx, "download", outcome) {
        let title = ctx.catalog.borrow().detail(id).title;
        ctx.activity
            .borrow_mut()
            .download(id, &title, quality.as_str());
        println!("{}", ticket.notice);
        println!("  {} -> {}", ticket.url, ticket.filename);
    }
    Ok(())
}

fn print_comments(ctx: &Context, image_id: &str) {
    let board = ctx.comments.borrow();
    let thread = board.thread(image_id);
    let now = Utc::now();
    println!("Comments ({})", thread.len());
    if thread.is_empty() {
        println!("  No comments yet. Be the first to comment!");
    }
    for comment in thread {
        println!(
            "  [{}] {} - {}{}",
            comment.id,
            comment.author.name,
            relative_time(&comment.created_at, &now),
            if comment.is_liked { " (liked)" } else { "" },
        );
        println!("      {}", comment.content);
        println!("      {} likes", comment.likes);
    }
}

fn post_comment(ctx: &Context, text: &str) -> Result<()> {
    let image_id = image_arg(ctx, None)?;
    let outcome = ctx.comments.borrow_mut().post(
        &mut ctx.session.borrow_mut(),
        &image_id,
        text,
        Utc::now(),
    )?;
    match finish(ctx, "post_comment", outcome) {
        Some(PostResult::Posted { id, notice }) => {
            let title = ctx.catalog.borrow().detail(&image_id).title;
            ctx.activity
                .borrow_mut()
                .comment_post(&id, &image_id, &title);
            println!("{}", notice);
        }
        Some(PostResult::Ignored) => ctx.debug("blank comment ignored"),
        None => {}
    }
    Ok(())
}

fn handle_admin(ctx: &Context, rest: &[String]) -> Result<()> {
    let guard = ctx.dashboard.borrow_mut().open(&ctx.session.borrow());
    if guard != RouteGuard::Render {
        return navigate(ctx, "/admin");
    }
    *ctx.route.borrow_mut() = Route::Admin;

    let Some((sub, args)) = rest.split_first() else {
        return print_admin_tab(ctx, Tab::Overview, &[]);
    };
    if sub == "upload" && !args.is_empty() {
        return handle_upload(ctx, args);
    }
    if let Some(tab) = Tab::from_str(sub) {
        return print_admin_tab(ctx, tab, args);
    }

    let mut session = ctx.session.borrow_mut();
    match sub.as_str() {
        "toggle" | "delete" => {
            let id = args
                .first()
                .ok_or_else(|| anyhow!("Usage: /admin {} <image-id>", sub))?;
            let mut catalog = ctx.catalog.borrow_mut();
            let outcome = if sub == "toggle" {
                images::toggle_status(&mut session, &mut catalog, id)?
            } else {
                images::delete(&mut session, &mut catalog, id)?
            };
            drop(session);
            if let Some(change) = finish(ctx, "manage_images", outcome) {
                let mut activity = ctx.activity.borrow_mut();
                if sub == "toggle" {
                    activity.image_status(id, &change.image.title, change.image.status.as_str());
                } else {
                    activity.image_delete(id, &change.image.title);
                }
                println!("{}", change.notice);
            }
        }
        "approve" | "reject" | "remove" => {
            let id = args
                .first()
                .ok_or_else(|| anyhow!("Usage: /admin {} <comment-id>", sub))?;
            let mut board = ctx.comments.borrow_mut();
            let outcome = match sub.as_str() {
                "approve" => moderation::approve(&mut session, &mut board, id)?,
                "reject" => moderation::reject(&mut session, &mut board, id)?,
                _ => moderation::delete(&mut session, &mut board, id)?,
            };
            let status = board.get(id).map(|c| c.status.as_str()).unwrap_or("deleted");
            drop(session);
            if let Some(notice) = finish(ctx, "moderate_comments", outcome) {
                ctx.activity.borrow_mut().comment_moderate(id, status);
                println!("{}", notice);
            }
        }
        other => bail!("Unknown admin command: {}", other),
    }
    Ok(())
}

fn print_admin_tab(ctx: &Context, tab: Tab, args: &[String]) -> Result<()> {
    ctx.dashboard.borrow_mut().tab = tab;
    println!("Admin Dashboard - {}", tab);
    match tab {
        Tab::Overview => {
            let overview = stats::overview(
                &ctx.catalog.borrow(),
                &ctx.comments.borrow(),
                &ctx.session.borrow(),
                &ctx.activity.borrow(),
                &Utc::now(),
            )?;
            let t = overview.totals;
            println!("  Total Images: {}", t.images);
            println!("  Total Users:  {}", t.users);
            println!("  Downloads:    {}", t.downloads);
            println!("  Comments:     {}", t.comments);
            println!("Recent Activity:");
            if overview.recent.is_empty() {
                println!("  No recent activity");
            }
            for line in &overview.recent {
                println!("  {} ({})", line.message, line.time);
            }
            println!("Top Images:");
            for (rank, img) in overview.top.iter().enumerate() {
                println!(
                    "  #{} {} - {} downloads, {} likes, {} views",
                    rank + 1,
                    img.title,
                    img.downloads,
                    img.likes,
                    img.views
                );
            }
        }
        Tab::Images => {
            if let Some(term) = args.first() {
                ctx.dashboard.borrow_mut().image_search = args.join(" ");
                ctx.debug(&format!("image search: {}", term));
            }
            let term = ctx.dashboard.borrow().image_search.clone();
            let catalog = ctx.catalog.borrow();
            for image in images::search(&catalog, &term) {
                println!(
                    "  {:<16} {:<28} {:<12} {:<9} {} downloads, {} likes, {}",
                    image.id,
                    image.title,
                    image.category,
                    images::status_label(image.status),
                    image.downloads,
                    image.likes,
                    short_date(&image.uploaded_at),
                );
            }
        }
        Tab::Upload => print_upload_queue(ctx),
        Tab::Comments => {
            let board = ctx.comments.borrow();
            let counts = moderation::counts(&board);
            println!(
                "  {} pending, {} flagged",
                counts.pending, counts.flagged
            );
            for row in moderation::rows(&board, &ctx.catalog.borrow()) {
                println!(
                    "  [{}] {} <{}> on \"{}\" - {} - {}",
                    row.comment_id, row.author, row.email, row.image_title, row.badge, row.date
                );
                println!("      {}", row.content);
            }
        }
        Tab::Settings => {
            print!("{}", ctx.config.to_toml()?);
        }
    }
    Ok(())
}

fn print_upload_queue(ctx: &Context) {
    let queue = ctx.uploads.borrow();
    if queue.is_empty() {
        println!("  Upload queue is empty. Use /admin upload add <path>");
        return;
    }
    for (i, entry) in queue.entries().iter().enumerate() {
        println!(
            "  #{} {} ({} bytes) id {}",
            i + 1,
            entry.path.display(),
            entry.size,
            entry.id
        );
        println!("      title: {}", entry.title);
        println!("      description: {}", entry.description);
        println!(
            "      category: {}",
            entry.category.map(|c| c.as_str()).unwrap_or("(none)")
        );
        if !entry.tags.is_empty() {
            println!("      tags: {}", entry.tags.join(", "));
        }
    }
}

/// 1-based index from the command line
fn parse_index(arg: Option<&String>) -> Result<usize> {
    let raw = arg.ok_or_else(|| anyhow!("Missing upload number"))?;
    match raw.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n - 1),
        _ => bail!("Invalid upload number: {}", raw),
    }
}

fn handle_upload(ctx: &Context, args: &[String]) -> Result<()> {
    let Some((sub, args)) = args.split_first() else {
        print_upload_queue(ctx);
        return Ok(());
    };
    match sub.as_str() {
        "list" => print_upload_queue(ctx),
        "add" => {
            if args.is_empty() {
                bail!("Usage: /admin upload add <path|dir|glob>...");
            }
            for source in args {
                let report = ctx.uploads.borrow_mut().add(source)?;
                println!("Added {} image(s) from {}", report.added, source);
                for skipped in &report.skipped {
                    println!("  skipped {}", skipped.display());
                }
            }
        }
        "set" => {
            let index = parse_index(args.first())?;
            let field = args.get(1).ok_or_else(|| anyhow!("Missing field"))?;
            let value = args[2.min(args.len())..].join(" ");
            let mut queue = ctx.uploads.borrow_mut();
            match field.as_str() {
                "title" => queue.set_title(index, &value)?,
                "description" => queue.set_description(index, &value)?,
                "category" => queue.set_category(index, &value)?,
                other => bail!("Unknown field: {}", other),
            }
        }
        "tag" => {
            let index = parse_index(args.first())?;
            ctx.uploads
                .borrow_mut()
                .add_tag(index, &args[1.min(args.len())..].join(" "))?;
        }
        "untag" => {
            let index = parse_index(args.first())?;
            let tag_index = parse_index(args.get(1))?;
            let tag = ctx.uploads.borrow_mut().remove_tag(index, tag_index)?;
            println!("Removed tag {}", tag);
        }
        "drop" => {
            let index = parse_index(args.first())?;
            let entry = ctx.uploads.borrow_mut().remove(index)?;
            println!("Removed {}", entry.path.display());
        }
        "publish" => {
            let outcome = ctx.uploads.borrow_mut().publish(
                &mut ctx.session.borrow_mut(),
                &mut ctx.catalog.borrow_mut(),
                Utc::now(),
            )?;
            if let Some(published) = finish(ctx, "upload_images", outcome) {
                let mut activity = ctx.activity.borrow_mut();
                for (id, title) in &published.images {
                    activity.upload(id, title);
                }
                println!("{}", published.notice);
            }
        }
        other => bail!("Unknown upload command: {}", other),
    }
    Ok(())
}

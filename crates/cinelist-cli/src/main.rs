//! cinelist - Tamil movie discovery, favorites and watchlist CLI.

/// Application configuration (TOML).
mod config;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use cinelist_api::backend::{
    BackendClient, Credentials, ListItem, ListKind, PictureUpload, ProfilePatch, Registration,
};
use cinelist_api::catalog::{
    CatalogClient, DiscoverParams, LocalCatalogApi, MoviePage, SearchParams,
};
use cinelist_api::soundtrack::{LocalSoundtrackApi, SoundtrackClient, Track};
use cinelist_db::{KeyValueStore, SqliteStore};
use cinelist_sync::{Session, SyncContext, Synced, bootstrap};
use clap::{Parser, Subcommand};
use tracing::instrument;
use tracing_subscriber::filter::EnvFilter;
#[cfg(not(feature = "otel"))]
use tracing_subscriber::fmt;
#[cfg(feature = "otel")]
use tracing_subscriber::layer::SubscriberExt;
#[cfg(feature = "otel")]
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::{AppConfig, resolve_config_path};

/// User-Agent sent to both backends.
const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Display language for TMDB details, similar titles and genre names.
const DEFAULT_DISPLAY_LANGUAGE: &str = "en-US";

/// CLI argument parser.
#[derive(Parser)]
#[command(about, version)]
struct Cli {
    /// Override config/data directory.
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Commands that need the session and lists.
    #[command(flatten)]
    Session(SessionCommands),
    /// Browse the TMDB catalog.
    Catalog(CatalogCommand),
}

/// Subcommands run against local storage and the backend.
#[derive(Subcommand)]
enum SessionCommands {
    /// Log in and sync favorites and watchlist.
    Login(LoginArgs),
    /// Create an account (does not log in).
    Register(RegisterArgs),
    /// End the session and clear local lists.
    Logout,
    /// Show the logged-in user.
    Whoami,
    /// Exchange the session token for a new one.
    Refresh,
    /// Update the account profile.
    Profile(ProfileCommand),
    /// Manage favorites.
    Favorites(ListCommand),
    /// Manage the watchlist.
    Watchlist(ListCommand),
}

/// Arguments for the `login` subcommand.
#[derive(clap::Args)]
struct LoginArgs {
    /// Account email.
    #[arg(long, required = true)]
    email: String,
    /// Account password.
    #[arg(long, required = true)]
    password: String,
}

/// Arguments for the `register` subcommand.
#[derive(clap::Args)]
struct RegisterArgs {
    /// Full name.
    #[arg(long, required = true)]
    name: String,
    /// Account email.
    #[arg(long, required = true)]
    email: String,
    /// Password (at least 6 characters).
    #[arg(long, required = true)]
    password: String,
    /// Password confirmation.
    #[arg(long, required = true)]
    confirm_password: String,
}

/// Arguments for the `profile` subcommand.
#[derive(clap::Args)]
struct ProfileCommand {
    /// Profile subcommand to run.
    #[command(subcommand)]
    command: ProfileSubcommands,
}

/// Available profile subcommands.
#[derive(Subcommand)]
enum ProfileSubcommands {
    /// Change name or email.
    Update(ProfileUpdateArgs),
    /// Upload a profile picture.
    Picture(ProfilePictureArgs),
}

/// Arguments for the `profile update` subcommand.
#[derive(clap::Args)]
struct ProfileUpdateArgs {
    /// New display name.
    #[arg(long)]
    name: Option<String>,
    /// New email.
    #[arg(long)]
    email: Option<String>,
}

/// Arguments for the `profile picture` subcommand.
#[derive(clap::Args)]
struct ProfilePictureArgs {
    /// Image file (jpg, png, gif or webp).
    #[arg(long, required = true)]
    file: PathBuf,
}

/// Arguments for the `favorites` and `watchlist` subcommands.
#[derive(clap::Args)]
struct ListCommand {
    /// List subcommand to run.
    #[command(subcommand)]
    command: ListSubcommands,
}

/// Available list subcommands.
#[derive(Subcommand)]
enum ListSubcommands {
    /// Show the list after background sync.
    List,
    /// Add a movie.
    Add(ListAddArgs),
    /// Remove a movie.
    Remove(ListRemoveArgs),
    /// Fetch the list from the backend now.
    Sync,
}

/// Arguments for the list `add` subcommand.
#[derive(clap::Args)]
struct ListAddArgs {
    /// TMDB movie ID.
    #[arg(long, required = true)]
    id: u64,
    /// Movie title; looked up on TMDB when omitted.
    #[arg(long)]
    title: Option<String>,
}

/// Arguments for the list `remove` subcommand.
#[derive(clap::Args)]
struct ListRemoveArgs {
    /// TMDB movie ID.
    #[arg(long, required = true)]
    id: u64,
}

/// Arguments for the `catalog` subcommand.
#[derive(clap::Args)]
struct CatalogCommand {
    /// Catalog subcommand to run.
    #[command(subcommand)]
    command: CatalogSubcommands,
}

/// Available catalog subcommands.
#[derive(Subcommand)]
enum CatalogSubcommands {
    /// TMDB lookups.
    #[command(flatten)]
    Tmdb(TmdbSubcommands),
    /// Find a movie's soundtrack on Spotify.
    Soundtrack(SoundtrackArgs),
}

/// Subcommands answered by TMDB.
#[derive(Subcommand)]
enum TmdbSubcommands {
    /// Discover movies by language, region and genre.
    Discover(DiscoverArgs),
    /// Search movies by title.
    Search(SearchArgs),
    /// Show movie details.
    Details(DetailsArgs),
    /// Show movies similar to a movie.
    Similar(SimilarArgs),
    /// Recommend popular movies from any of the given genres.
    Recommend(RecommendArgs),
    /// List movie genres.
    Genres(GenresArgs),
}

/// Language and region filters shared by discover and search.
#[derive(clap::Args)]
struct FilterArgs {
    /// Original language (default from config: "ta").
    #[arg(long)]
    language: Option<String>,
    /// Release region (default from config: "IN").
    #[arg(long)]
    region: Option<String>,
    /// Result page.
    #[arg(long, default_value_t = 1)]
    page: u32,
}

/// Arguments for the `catalog discover` subcommand.
#[derive(clap::Args)]
struct DiscoverArgs {
    /// Genre ID filter (repeatable; all must match).
    #[arg(long = "genre")]
    genres: Vec<u32>,
    /// Language, region and page.
    #[command(flatten)]
    filter: FilterArgs,
}

/// Arguments for the `catalog search` subcommand.
#[derive(clap::Args)]
struct SearchArgs {
    /// Search query (e.g. "Vikram").
    #[arg(long, required = true)]
    query: String,
    /// Language, region and page.
    #[command(flatten)]
    filter: FilterArgs,
}

/// Arguments for the `catalog details` subcommand.
#[derive(clap::Args)]
struct DetailsArgs {
    /// TMDB movie ID.
    #[arg(long, required = true)]
    id: u64,
    /// Response language (default: "en-US").
    #[arg(long, default_value = DEFAULT_DISPLAY_LANGUAGE)]
    language: String,
}

/// Arguments for the `catalog similar` subcommand.
#[derive(clap::Args)]
struct SimilarArgs {
    /// TMDB movie ID.
    #[arg(long, required = true)]
    id: u64,
    /// Response language (default: "en-US").
    #[arg(long, default_value = DEFAULT_DISPLAY_LANGUAGE)]
    language: String,
    /// Result page.
    #[arg(long, default_value_t = 1)]
    page: u32,
}

/// Arguments for the `catalog recommend` subcommand.
#[derive(clap::Args)]
struct RecommendArgs {
    /// Genre ID (repeatable; any may match).
    #[arg(long = "genre", required = true)]
    genres: Vec<u32>,
    /// Language, region and page.
    #[command(flatten)]
    filter: FilterArgs,
}

/// Arguments for the `catalog genres` subcommand.
#[derive(clap::Args)]
struct GenresArgs {
    /// Response language (default: "en-US").
    #[arg(long, default_value = DEFAULT_DISPLAY_LANGUAGE)]
    language: String,
}

/// Arguments for the `catalog soundtrack` subcommand.
#[derive(clap::Args)]
struct SoundtrackArgs {
    /// TMDB movie ID or movie title.
    #[arg(
        required_unless_present_any = ["playlist", "album"],
        conflicts_with_all = ["playlist", "album"]
    )]
    movie: Option<String>,
    /// List a Spotify playlist instead.
    #[arg(long, conflicts_with = "album")]
    playlist: Option<String>,
    /// List a Spotify album instead.
    #[arg(long)]
    album: Option<String>,
    /// Maximum number of tracks (1-50).
    #[arg(long, default_value_t = 10)]
    limit: u32,
}

// --- Wiring ---

/// Loads `config.toml` for `dir`.
///
/// # Errors
///
/// Returns an error if the config path cannot be resolved or the file is invalid.
fn load_config(dir: Option<&PathBuf>) -> Result<AppConfig> {
    let config_path = resolve_config_path(dir)?;
    AppConfig::load(&config_path)
}

/// Opens local storage and wires the session, lists and backend client.
///
/// The session store is the token source of the backend client, so a
/// refreshed token is persisted and a rejected refresh logs out.
///
/// # Errors
///
/// Returns an error if storage cannot be opened or the client fails to build.
#[instrument(skip_all)]
fn open_context(config: &AppConfig, dir: Option<&PathBuf>) -> Result<SyncContext<BackendClient>> {
    let store =
        SqliteStore::open(dir.map(PathBuf::as_path)).context("failed to open local storage")?;
    let storage: Arc<dyn KeyValueStore> = Arc::new(store);
    let base_url = config.backend.base_url()?;
    let timeout = config.backend.timeout();

    SyncContext::new(storage, move |session| {
        let mut builder = BackendClient::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .token_store(session);
        if let Some(url) = base_url {
            builder = builder.base_url(url);
        }
        builder.build().context("failed to build backend client")
    })
}

/// Builds the TMDB client from `TMDB_API_TOKEN` and the `[catalog]` section.
///
/// # Errors
///
/// Returns an error if `TMDB_API_TOKEN` is not set or the client fails to build.
#[instrument(skip_all)]
fn build_catalog_client(config: &AppConfig) -> Result<CatalogClient> {
    let api_token = std::env::var("TMDB_API_TOKEN")
        .context("TMDB_API_TOKEN environment variable is required")?;

    let mut builder = CatalogClient::builder()
        .api_token(api_token)
        .user_agent(USER_AGENT)
        .timeout(config.backend.timeout());
    if let Some(url) = config.catalog.base_url()? {
        builder = builder.base_url(url);
    }
    builder.build().context("failed to build TMDB client")
}

/// Builds the Spotify client from `SPOTIFY_CLIENT_ID`, `SPOTIFY_CLIENT_SECRET`
/// and the `[soundtrack]` section.
///
/// # Errors
///
/// Returns an error if a credential is not set or the client fails to build.
#[instrument(skip_all)]
fn build_soundtrack_client(config: &AppConfig) -> Result<SoundtrackClient> {
    let client_id = std::env::var("SPOTIFY_CLIENT_ID")
        .context("SPOTIFY_CLIENT_ID environment variable is required")?;
    let client_secret = std::env::var("SPOTIFY_CLIENT_SECRET")
        .context("SPOTIFY_CLIENT_SECRET environment variable is required")?;

    let mut builder = SoundtrackClient::builder()
        .client_id(client_id)
        .client_secret(client_secret)
        .user_agent(USER_AGENT)
        .timeout(config.backend.timeout());
    if let Some(url) = config.soundtrack.base_url()? {
        builder = builder.base_url(url);
    }
    if let Some(url) = config.soundtrack.token_url()? {
        builder = builder.token_url(url);
    }
    builder.build().context("failed to build Spotify client")
}

// --- Output ---

/// Logs the user of `session`, or that nobody is logged in.
fn log_session(session: &Session) {
    match session.user.as_ref() {
        Some(user) if session.is_authenticated => {
            tracing::info!("Logged in as {} <{}> (id: {})", user.name, user.email, user.id);
            if let Some(ref picture) = user.profile_picture {
                tracing::info!("Profile picture: {picture}");
            }
        }
        _ => tracing::info!("Not logged in"),
    }
}

/// Logs list items as a table.
fn log_items(kind: ListKind, items: &[ListItem]) {
    tracing::info!("{kind}: {} movie(s)", items.len());
    if items.is_empty() {
        return;
    }
    tracing::info!("ID\tTitle\t\t\tReleaseDate\tRating");
    for item in items {
        tracing::info!(
            "{}\t{}\t\t{}\t{}",
            item.id,
            item.title,
            item.release_date.as_deref().unwrap_or("-"),
            item.vote_average
                .map_or_else(|| String::from("-"), |v| format!("{v:.1}")),
        );
    }
}

/// Logs the result of a list operation, including any sync warning.
fn log_synced(kind: ListKind, synced: &Synced<Vec<ListItem>>) {
    if let Some(ref warning) = synced.warning {
        tracing::warn!("{kind} saved locally, backend sync failed: {warning}");
    }
    log_items(kind, &synced.value);
}

/// Logs a page of movies as a table.
fn log_movie_page(page: &MoviePage) {
    tracing::info!(
        "Total results: {} (page {}/{})",
        page.total_results,
        page.page,
        page.total_pages
    );
    tracing::info!("ID\tTitle\t\t\tOrigLang\tReleaseDate\tRating");
    for movie in &page.results {
        tracing::info!(
            "{}\t{}\t{}\t\t{}\t{}",
            movie.id,
            movie.title,
            movie.original_language.as_deref().unwrap_or("-"),
            movie.release_date.as_deref().unwrap_or("-"),
            movie
                .vote_average
                .map_or_else(|| String::from("-"), |v| format!("{v:.1}")),
        );
    }
}

/// Logs tracks as a table.
fn log_tracks(tracks: &[Track]) {
    tracing::info!("{} track(s)", tracks.len());
    if tracks.is_empty() {
        return;
    }
    tracing::info!("Track\t\t\tArtists\t\t\tAlbum\tLink");
    for track in tracks {
        tracing::info!(
            "{}\t{}\t{}\t{}",
            track.name,
            track.artist_names(),
            track.album.as_ref().map_or("-", |a| a.name.as_str()),
            track.external_urls.spotify.as_deref().unwrap_or("-"),
        );
    }
}

// --- Account commands ---

/// Runs the `login` subcommand.
///
/// # Errors
///
/// Returns an error if the credentials are rejected or the backend is unreachable.
#[instrument(skip_all)]
async fn run_login(args: &LoginArgs, ctx: &SyncContext<BackendClient>) -> Result<()> {
    let credentials = Credentials::new(args.email.trim(), args.password.as_str());
    let session = ctx.login(&credentials).await.context("login failed")?;
    log_session(&session);
    Ok(())
}

/// Runs the `register` subcommand.
///
/// # Errors
///
/// Returns an error if validation fails or the backend rejects the registration.
#[instrument(skip_all)]
async fn run_register(args: &RegisterArgs, ctx: &SyncContext<BackendClient>) -> Result<()> {
    let registration = Registration {
        full_name: args.name.clone(),
        email: String::from(args.email.trim()),
        password: args.password.clone(),
        confirm_password: args.confirm_password.clone(),
    };
    ctx.auth()
        .register(&registration)
        .await
        .context("registration failed")?;
    tracing::info!("Account created. Log in with `cinelist login`.");
    Ok(())
}

/// Runs the `refresh` subcommand.
///
/// # Errors
///
/// Returns an error if logged out, the session expired, or the backend is unreachable.
#[instrument(skip_all)]
async fn run_refresh(ctx: &SyncContext<BackendClient>) -> Result<()> {
    ctx.auth()
        .refresh_token()
        .await
        .context("token refresh failed")?;
    tracing::info!("Token refreshed");
    Ok(())
}

/// Runs the `profile update` subcommand.
///
/// # Errors
///
/// Returns an error if logged out, nothing was given, or the backend rejects the update.
#[instrument(skip_all)]
async fn run_profile_update(
    args: &ProfileUpdateArgs,
    ctx: &SyncContext<BackendClient>,
) -> Result<()> {
    let patch = ProfilePatch {
        name: args.name.clone(),
        email: args.email.clone(),
        ..ProfilePatch::default()
    };
    let session = ctx
        .auth()
        .update_profile(&patch)
        .await
        .context("profile update failed")?;
    log_session(&session);
    Ok(())
}

/// Guesses the image MIME type from the file extension.
fn image_mime_type(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

/// Runs the `profile picture` subcommand.
///
/// # Errors
///
/// Returns an error if the file is unreadable or not an image, or the upload fails.
#[instrument(skip_all)]
async fn run_profile_picture(
    args: &ProfilePictureArgs,
    ctx: &SyncContext<BackendClient>,
) -> Result<()> {
    let mime_type = image_mime_type(&args.file).with_context(|| {
        format!(
            "unsupported image type: {} (expected jpg, png, gif or webp)",
            args.file.display()
        )
    })?;
    let bytes = std::fs::read(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let file_name = args
        .file
        .file_name()
        .and_then(|n| n.to_str())
        .map_or_else(|| String::from("profile"), String::from);
    let upload = PictureUpload {
        file_name,
        mime_type: String::from(mime_type),
        bytes,
    };

    let session = ctx
        .auth()
        .upload_profile_picture(&upload)
        .await
        .context("profile picture upload failed")?;
    log_session(&session);
    Ok(())
}

// --- List commands ---

/// Runs a `favorites` or `watchlist` subcommand.
///
/// # Errors
///
/// Returns an error if a title lookup on TMDB fails. Backend sync failures
/// are reported as warnings.
#[instrument(skip_all, fields(list = %kind))]
async fn run_list(
    kind: ListKind,
    command: &ListSubcommands,
    config: &AppConfig,
    ctx: &SyncContext<BackendClient>,
) -> Result<()> {
    let reconciler = ctx.list(kind);
    match command {
        ListSubcommands::List => {
            ctx.settle().await;
            let snapshot = reconciler.state().snapshot();
            if let Some(ref error) = snapshot.error {
                tracing::warn!("showing local {kind}, backend sync failed: {error}");
            }
            log_items(kind, &snapshot.items);
        }
        ListSubcommands::Add(args) => {
            let item = match args.title {
                Some(ref title) => ListItem::new(args.id, title.as_str()),
                None => {
                    let catalog = build_catalog_client(config)?;
                    catalog
                        .movie_details(args.id, DEFAULT_DISPLAY_LANGUAGE)
                        .await
                        .with_context(|| format!("failed to look up movie {}", args.id))?
                        .to_list_item()
                }
            };
            ctx.settle().await;
            tracing::info!("Adding {} ({}) to {kind}", item.title, item.id);
            log_synced(kind, &reconciler.add(item).await);
        }
        ListSubcommands::Remove(args) => {
            ctx.settle().await;
            tracing::info!("Removing {} from {kind}", args.id);
            log_synced(kind, &reconciler.remove(args.id).await);
        }
        ListSubcommands::Sync => {
            ctx.settle().await;
            log_synced(kind, &reconciler.fetch().await);
        }
    }
    Ok(())
}

// --- Catalog commands ---

/// Discover parameters from config defaults and command-line overrides.
fn discover_params(filter: &FilterArgs, config: &AppConfig) -> DiscoverParams {
    DiscoverParams::new()
        .original_language(
            filter
                .language
                .as_deref()
                .unwrap_or(&config.catalog.language),
        )
        .region(filter.region.as_deref().unwrap_or(&config.catalog.region))
        .page(filter.page)
}

/// Runs a `catalog` subcommand.
///
/// # Errors
///
/// Returns an error if the client fails to build or the API request fails.
async fn run_catalog(command: &CatalogSubcommands, config: &AppConfig) -> Result<()> {
    match command {
        CatalogSubcommands::Tmdb(command) => run_tmdb(command, config).await,
        CatalogSubcommands::Soundtrack(args) => run_soundtrack(args, config).await,
    }
}

/// Runs a TMDB `catalog` subcommand.
///
/// # Errors
///
/// Returns an error if the TMDB client fails to build or the API request fails.
#[instrument(skip_all)]
async fn run_tmdb(command: &TmdbSubcommands, config: &AppConfig) -> Result<()> {
    let client = build_catalog_client(config)?;

    match command {
        TmdbSubcommands::Discover(args) => {
            let params = args
                .genres
                .iter()
                .fold(discover_params(&args.filter, config), |p, &g| p.genre(g));
            let page = client
                .discover_movies(&params)
                .await
                .context("TMDB discover/movie request failed")?;
            log_movie_page(&page);
        }
        TmdbSubcommands::Search(args) => {
            let language = args
                .filter
                .language
                .as_deref()
                .unwrap_or(&config.catalog.language);
            let region = args
                .filter
                .region
                .as_deref()
                .unwrap_or(&config.catalog.region);
            let mut params = SearchParams::new(args.query.as_str())
                .original_language(language)
                .page(args.filter.page);
            if !region.is_empty() {
                params = params.region(region);
            }
            let page = client
                .search_movies(&params)
                .await
                .context("TMDB search/movie request failed")?;
            log_movie_page(&page);
        }
        TmdbSubcommands::Details(args) => {
            let movie = client
                .movie_details(args.id, &args.language)
                .await
                .context("TMDB movie details request failed")?;
            tracing::info!("ID: {}", movie.id);
            tracing::info!("Title: {}", movie.title);
            if let Some(ref original) = movie.original_title {
                tracing::info!("Original title: {original}");
            }
            tracing::info!(
                "Release date: {}",
                movie.release_date.as_deref().unwrap_or("-")
            );
            if let Some(runtime) = movie.runtime {
                tracing::info!("Runtime: {runtime} min");
            }
            let genres: Vec<&str> = movie.genres.iter().map(|g| g.name.as_str()).collect();
            tracing::info!("Genres: {}", genres.join(", "));
            if let Some(rating) = movie.vote_average {
                tracing::info!(
                    "Rating: {rating:.1} ({} votes)",
                    movie.vote_count.unwrap_or(0)
                );
            }
            if let Some(ref overview) = movie.overview {
                tracing::info!("Overview: {overview}");
            }
        }
        TmdbSubcommands::Similar(args) => {
            let page = client
                .similar_movies(args.id, &args.language, args.page)
                .await
                .context("TMDB similar movies request failed")?;
            log_movie_page(&page);
        }
        TmdbSubcommands::Recommend(args) => {
            let base = discover_params(&args.filter, config);
            let page = client
                .recommend_movies(&args.genres, &base)
                .await
                .context("TMDB recommendation request failed")?;
            log_movie_page(&page);
        }
        TmdbSubcommands::Genres(args) => {
            let list = client
                .genres(&args.language)
                .await
                .context("TMDB genre list request failed")?;
            tracing::info!("ID\tName");
            for genre in &list.genres {
                tracing::info!("{}\t{}", genre.id, genre.name);
            }
        }
    }
    Ok(())
}

/// Resolves the movie title: a numeric argument is a TMDB movie ID.
///
/// # Errors
///
/// Returns an error if the TMDB lookup fails.
async fn soundtrack_title(movie: &str, config: &AppConfig) -> Result<String> {
    let Ok(movie_id) = movie.trim().parse::<u64>() else {
        return Ok(String::from(movie.trim()));
    };
    let catalog = build_catalog_client(config)?;
    let details = catalog
        .movie_details(movie_id, DEFAULT_DISPLAY_LANGUAGE)
        .await
        .with_context(|| format!("failed to look up movie {movie_id}"))?;
    Ok(details.title)
}

/// Runs the `catalog soundtrack` subcommand.
///
/// A curated playlist from `[soundtrack.playlists]` takes precedence over
/// searching.
///
/// # Errors
///
/// Returns an error if the Spotify client fails to build or the lookup fails.
#[instrument(skip_all)]
async fn run_soundtrack(args: &SoundtrackArgs, config: &AppConfig) -> Result<()> {
    if let Some(ref playlist) = args.playlist {
        let client = build_soundtrack_client(config)?;
        let tracks = client
            .playlist_tracks(playlist, args.limit)
            .await
            .context("Spotify playlist request failed")?;
        log_tracks(&tracks);
        return Ok(());
    }
    if let Some(ref album) = args.album {
        let client = build_soundtrack_client(config)?;
        let tracks = client
            .album_tracks(album, args.limit)
            .await
            .context("Spotify album request failed")?;
        log_tracks(&tracks);
        return Ok(());
    }

    let movie = args.movie.as_deref().context("a movie ID or title is required")?;
    let title = soundtrack_title(movie, config).await?;
    let client = build_soundtrack_client(config)?;
    if let Some(playlist) = config.soundtrack.playlist_for(&title) {
        tracing::info!("Soundtrack of {title} (curated playlist {playlist})");
        let tracks = client
            .playlist_tracks(playlist, args.limit)
            .await
            .context("Spotify playlist request failed")?;
        log_tracks(&tracks);
        return Ok(());
    }

    let soundtrack = client
        .movie_soundtrack(&title)
        .await
        .context("Spotify soundtrack search failed")?;
    if soundtrack.fallback {
        tracing::warn!("No soundtrack found for {title}, showing popular Tamil songs");
    } else {
        tracing::info!("Soundtrack of {title} (query: {})", soundtrack.query);
    }
    let limit = usize::try_from(args.limit).unwrap_or(usize::MAX);
    log_tracks(
        soundtrack
            .tracks
            .get(..limit)
            .unwrap_or(soundtrack.tracks.as_slice()),
    );
    Ok(())
}

/// Runs a command that needs the session and lists.
///
/// Only list and account commands bootstrap the background reconcile; its
/// tasks are awaited before returning. Logout and whoami stay offline.
///
/// # Errors
///
/// Returns the command's error.
async fn run_session_command(
    command: &SessionCommands,
    config: &AppConfig,
    dir: Option<&PathBuf>,
) -> Result<()> {
    let ctx = open_context(config, dir)?;
    let session = match command {
        // Login reconciles itself; the others only read or end the session.
        SessionCommands::Login(_)
        | SessionCommands::Register(_)
        | SessionCommands::Logout
        | SessionCommands::Whoami => ctx.auth().restore(),
        _ => bootstrap(&ctx),
    };

    let result = match command {
        SessionCommands::Login(args) => run_login(args, &ctx).await,
        SessionCommands::Register(args) => run_register(args, &ctx).await,
        SessionCommands::Logout => {
            ctx.auth().logout();
            tracing::info!("Logged out");
            Ok(())
        }
        SessionCommands::Whoami => {
            log_session(&session);
            Ok(())
        }
        SessionCommands::Refresh => run_refresh(&ctx).await,
        SessionCommands::Profile(profile) => match profile.command {
            ProfileSubcommands::Update(ref args) => run_profile_update(args, &ctx).await,
            ProfileSubcommands::Picture(ref args) => run_profile_picture(args, &ctx).await,
        },
        SessionCommands::Favorites(list) => {
            run_list(ListKind::Favorites, &list.command, config, &ctx).await
        }
        SessionCommands::Watchlist(list) => {
            run_list(ListKind::Watchlist, &list.command, config, &ctx).await
        }
    };

    ctx.settle().await;
    result
}

/// Entry point.
///
/// # Errors
///
/// Returns an error if subcommand execution fails.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    #[cfg(not(feature = "otel"))]
    {
        fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .with_target(false)
            .init();
    }

    #[cfg(feature = "otel")]
    {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);

        let otel_layer = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
            .ok()
            .and_then(|_| {
                let exporter = opentelemetry_otlp::SpanExporter::builder()
                    .with_http()
                    .build()
                    .ok()?;

                let tracer_provider = opentelemetry_sdk::trace::SdkTracerProvider::builder()
                    .with_simple_exporter(exporter)
                    .build();

                let tracer = opentelemetry::trace::TracerProvider::tracer(
                    &tracer_provider,
                    env!("CARGO_PKG_NAME"),
                );
                opentelemetry::global::set_tracer_provider(tracer_provider);

                Some(tracing_opentelemetry::layer().with_tracer(tracer))
            });

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .with(otel_layer)
            .init();
    }

    let cli = Cli::parse();
    let config = load_config(cli.dir.as_ref())?;
    match cli.command {
        Commands::Catalog(ref catalog) => run_catalog(&catalog.command, &config).await,
        Commands::Session(ref command) => {
            run_session_command(command, &config, cli.dir.as_ref()).await
        }
    }
}

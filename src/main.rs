use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use classifieds::graph::{self, GraphClient};
use classifieds::models::{
    format_price, AdFilter, AdStatus, AdUpdate, ClassifiedAd, Condition, NewAd, NewMessage,
    NewSavedSearch, SortBy,
};
use classifieds::{AppConfig, FavoriteSet, Listing, SharePointService};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

type Service = SharePointService<GraphClient>;

#[derive(Parser)]
#[command(
    name = "classifieds",
    version,
    about = "Company classifieds: buy, sell, and exchange items with your colleagues"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Browse listings (the default)
    List(ListArgs),

    /// Post a new ad
    Create(CreateArgs),

    /// Show one ad and count the view
    Show { id: String },

    /// Change fields of an existing ad
    Update(UpdateArgs),

    /// Delete an ad
    Delete { id: String },

    /// Upload an image for an ad and print its URL
    UploadImage {
        ad_id: String,
        path: PathBuf,
        /// Overrides the type guessed from the file extension
        #[arg(long)]
        content_type: Option<String>,
    },

    /// Create any missing SharePoint lists
    InitLists,

    /// List categories
    Categories {
        /// Add the default categories that are missing first
        #[arg(long)]
        seed: bool,
    },

    /// Persisted favorites
    Favorites {
        #[command(subcommand)]
        cmd: FavoriteCmd,
    },

    /// Saved searches
    Searches {
        #[command(subcommand)]
        cmd: SearchCmd,
    },

    /// Messages between buyers and sellers
    Messages {
        #[command(subcommand)]
        cmd: MessageCmd,
    },

    /// Print the interactive sign-in URL
    LoginUrl {
        #[arg(long)]
        state: Option<String>,
    },

    /// Print the sign-out URL
    LogoutUrl,
}

#[derive(clap::Args, Default)]
struct ListArgs {
    #[arg(long)]
    search: Option<String>,
    #[arg(long)]
    category: Option<String>,
    #[arg(long)]
    min_price: Option<f64>,
    #[arg(long)]
    max_price: Option<f64>,
    /// Active, Pending or Sold
    #[arg(long)]
    status: Option<AdStatus>,
    /// New, "Like New", Good, Fair or Poor
    #[arg(long)]
    condition: Option<Condition>,
    #[arg(long)]
    location: Option<String>,
    /// newest, oldest, price-low, price-high or popular
    #[arg(long)]
    sort: Option<SortBy>,
    /// Let Graph apply search, category and status before loading
    #[arg(long)]
    server_side: bool,
    /// Mark this user's favorites in the listing
    #[arg(long)]
    user: Option<String>,
}

impl ListArgs {
    fn to_filter(&self) -> AdFilter {
        AdFilter {
            search: self.search.clone(),
            category: self.category.clone(),
            min_price: self.min_price,
            max_price: self.max_price,
            status: self.status,
            condition: self.condition,
            location: self.location.clone(),
            sort_by: self.sort,
        }
    }
}

#[derive(clap::Args)]
struct CreateArgs {
    #[arg(long)]
    title: String,
    #[arg(long)]
    description: String,
    #[arg(long)]
    category: String,
    #[arg(long)]
    price: f64,
    #[arg(long)]
    original_price: Option<f64>,
    #[arg(long)]
    location: Option<String>,
    #[arg(long, default_value = "Good")]
    condition: Condition,
    /// Post as a "Looking For" request
    #[arg(long)]
    looking_for: bool,
    #[arg(long = "tag")]
    tags: Vec<String>,
    #[arg(long = "image")]
    images: Vec<String>,
    /// Defaults to the signed-in user's email
    #[arg(long)]
    created_by: Option<String>,
}

#[derive(clap::Args)]
struct UpdateArgs {
    id: String,
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    price: Option<f64>,
    #[arg(long)]
    status: Option<AdStatus>,
    #[arg(long)]
    featured: Option<bool>,
}

#[derive(Subcommand)]
enum FavoriteCmd {
    Add {
        #[arg(long)]
        user: String,
        ad_id: String,
    },
    Remove {
        #[arg(long)]
        user: String,
        ad_id: String,
    },
    List {
        #[arg(long)]
        user: String,
    },
}

#[derive(Subcommand)]
enum SearchCmd {
    Save {
        #[arg(long)]
        user: String,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        query: String,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        min_price: Option<f64>,
        #[arg(long)]
        max_price: Option<f64>,
    },
    List {
        #[arg(long)]
        user: String,
    },
    /// Run a saved search against the current listings
    Run {
        #[arg(long)]
        user: String,
        name: String,
    },
}

#[derive(Subcommand)]
enum MessageCmd {
    Send {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long)]
        ad: String,
        #[arg(long)]
        subject: String,
        #[arg(long)]
        content: String,
    },
    Inbox {
        #[arg(long)]
        user: String,
    },
    Read {
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "classifieds=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env().context("Failed to load configuration")?;

    match cli.command.unwrap_or(Command::List(ListArgs::default())) {
        Command::LoginUrl { state } => {
            let state = state.unwrap_or_else(|| Utc::now().timestamp_millis().to_string());
            println!("{}", graph::authorize_url(&config, &state)?);
        }
        Command::LogoutUrl => println!("{}", graph::logout_url(&config)?),
        command => {
            let site_id = config.require_site_id()?;
            let client = graph::connect(&config).context("Failed to create Graph client")?;
            info!("Using Graph at {} for site {}", client.base_url(), site_id);
            let service = SharePointService::new(client, site_id, config.list_ids.clone());
            run(&service, command).await?;
        }
    }

    Ok(())
}

async fn run(service: &Service, command: Command) -> Result<()> {
    match command {
        Command::List(args) => list(service, &args).await?,
        Command::Create(args) => create(service, args).await?,
        Command::Show { id } => {
            let mut ad = service
                .get_ad_by_id(&id)
                .await
                .with_context(|| format!("Failed to load ad {id}"))?;
            match service.increment_view_count(&id).await {
                Ok(views) => ad.view_count = views,
                Err(err) => warn!("Could not record view for ad {}: {}", id, err),
            }
            print_ad_details(&ad);
        }
        Command::Update(args) => {
            let update = AdUpdate {
                title: args.title,
                description: args.description,
                price: args.price,
                status: args.status,
                is_featured: args.featured,
                ..AdUpdate::default()
            };
            let ad = service.update_ad(&args.id, &update).await?;
            println!("Updated ad {}: {} ({})", ad.id, ad.title, ad.status);
        }
        Command::Delete { id } => {
            service.delete_ad(&id).await?;
            println!("Deleted ad {id}");
        }
        Command::UploadImage {
            ad_id,
            path,
            content_type,
        } => {
            let content = tokio::fs::read(&path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let file_name = path
                .file_name()
                .and_then(|n| n.to_str())
                .context("Image path has no file name")?;
            let content_type =
                content_type.unwrap_or_else(|| guess_content_type(file_name).to_string());
            let url = service
                .upload_image(&ad_id, file_name, content, &content_type)
                .await?;
            println!("{url}");
        }
        Command::InitLists => {
            let created = service.initialize_lists().await?;
            if created.is_empty() {
                println!("All lists already exist");
            }
            for kind in created {
                println!("Created list {kind}");
            }
        }
        Command::Categories { seed } => {
            if seed {
                let added = service.seed_categories().await?;
                info!("Added {} default categories", added);
            }
            for category in service.get_categories().await? {
                println!("{} {} - {}", category.icon, category.name, category.description);
            }
        }
        Command::Favorites { cmd } => favorites(service, cmd).await?,
        Command::Searches { cmd } => searches(service, cmd).await?,
        Command::Messages { cmd } => messages(service, cmd).await?,
        Command::LoginUrl { .. } | Command::LogoutUrl => {
            anyhow::bail!("sign-in URLs do not need a Graph connection")
        }
    }
    Ok(())
}

async fn list(service: &Service, args: &ListArgs) -> Result<()> {
    let filter = args.to_filter();
    let ads = service
        .get_ads(args.server_side.then_some(&filter))
        .await
        .context("Failed to load classifieds data")?;

    let favorites: FavoriteSet = match &args.user {
        Some(user) => service
            .get_favorite_entries(user)
            .await?
            .into_iter()
            .map(|favorite| favorite.ad_id)
            .collect(),
        None => FavoriteSet::new(),
    };

    let listing = Listing::build(&ads, &filter);
    print_listing(&listing, &filter, &favorites);
    Ok(())
}

async fn create(service: &Service, args: CreateArgs) -> Result<()> {
    let created_by = match args.created_by {
        Some(who) => who,
        None => service
            .current_user()
            .await
            .context("Pass --created-by or sign in with a delegated token")?
            .email,
    };

    let mut ad = NewAd {
        title: args.title,
        description: args.description,
        category: args.category,
        price: args.price,
        original_price: args.original_price,
        images: args.images,
        is_looking_for: args.looking_for,
        created_by,
        location: args.location,
        condition: Some(args.condition),
        ..NewAd::default()
    };
    for tag in &args.tags {
        ad.add_tag(tag);
    }

    let created = service.create_ad(&ad).await?;
    println!("Posted ad {}: {}", created.id, created.title);
    Ok(())
}

async fn favorites(service: &Service, cmd: FavoriteCmd) -> Result<()> {
    match cmd {
        FavoriteCmd::Add { user, ad_id } => {
            let favorite = service.add_to_favorites(&user, &ad_id).await?;
            println!(
                "Ad {} is a favorite (since {})",
                favorite.ad_id,
                favorite.added_date.format("%Y-%m-%d")
            );
        }
        FavoriteCmd::Remove { user, ad_id } => {
            if service.remove_from_favorites(&user, &ad_id).await? {
                println!("Removed ad {ad_id} from favorites");
            } else {
                println!("Ad {ad_id} was not a favorite");
            }
        }
        FavoriteCmd::List { user } => {
            let ads = service.get_favorites(&user).await?;
            for (i, ad) in ads.iter().enumerate() {
                print_ad_summary(i + 1, ad, true);
            }
        }
    }
    Ok(())
}

async fn searches(service: &Service, cmd: SearchCmd) -> Result<()> {
    match cmd {
        SearchCmd::Save {
            user,
            name,
            query,
            category,
            min_price,
            max_price,
        } => {
            let saved = service
                .save_search(&NewSavedSearch {
                    user_id: user,
                    name,
                    query,
                    category,
                    min_price,
                    max_price,
                })
                .await?;
            println!("Saved search {} ({})", saved.name, saved.id);
        }
        SearchCmd::List { user } => {
            for search in service.get_saved_searches(&user).await? {
                let state = if search.is_active { "" } else { " [inactive]" };
                println!("{} - \"{}\"{}", search.name, search.query, state);
            }
        }
        SearchCmd::Run { user, name } => {
            let search = service
                .get_saved_searches(&user)
                .await?
                .into_iter()
                .find(|s| s.name == name)
                .with_context(|| format!("No saved search named '{name}'"))?;
            let filter = search.to_filter();
            let ads = service.get_ads(Some(&filter)).await?;
            print_listing(&Listing::build(&ads, &filter), &filter, &FavoriteSet::new());
        }
    }
    Ok(())
}

async fn messages(service: &Service, cmd: MessageCmd) -> Result<()> {
    match cmd {
        MessageCmd::Send {
            from,
            to,
            ad,
            subject,
            content,
        } => {
            let sent = service
                .send_message(&NewMessage {
                    from_user_id: from,
                    to_user_id: to,
                    ad_id: ad,
                    subject,
                    content,
                })
                .await?;
            println!("Sent message {}", sent.id);
        }
        MessageCmd::Inbox { user } => {
            for message in service.get_inbox(&user).await? {
                let marker = if message.is_read { " " } else { "*" };
                println!(
                    "{} [{}] {} - {} (ad {}, from {})",
                    marker,
                    message.id,
                    message.sent_date.format("%Y-%m-%d %H:%M"),
                    message.subject,
                    message.ad_id,
                    message.from_user_id
                );
            }
        }
        MessageCmd::Read { id } => {
            service.mark_message_read(&id).await?;
            println!("Marked message {id} as read");
        }
    }
    Ok(())
}

fn guess_content_type(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

fn print_listing(listing: &Listing, filter: &AdFilter, favorites: &FavoriteSet) {
    println!("Sorted by: {}", filter.sort_by.unwrap_or_default().label());
    println!();
    if listing.is_empty() {
        if filter.has_active_filters() {
            println!("No ads found. Try adjusting your search or filters.");
        } else {
            println!("No ads found. Be the first to post an ad!");
        }
        return;
    }

    if !listing.featured.is_empty() {
        println!("Featured Ads");
        println!("============");
        for (i, ad) in listing.featured.iter().enumerate() {
            print_ad_summary(i + 1, ad, favorites.contains(&ad.id));
        }
    }

    println!("All Listings ({})", listing.regular.len());
    println!("================");
    for (i, ad) in listing.regular.iter().enumerate() {
        print_ad_summary(i + 1, ad, favorites.contains(&ad.id));
    }
    println!("Showing {} of {} ads", listing.regular.len(), listing.total);
}

fn print_ad_summary(n: usize, ad: &ClassifiedAd, favorite: bool) {
    let star = if favorite { " *" } else { "" };
    let looking = if ad.is_looking_for { "[Looking For] " } else { "" };
    println!("{}. {}{} ({}){}", n, looking, ad.title, format_price(ad.price), star);
    if let Some(original) = ad.original_price.filter(|_| ad.discount().is_some()) {
        println!("   was {}", format_price(original));
    }
    println!("   {} · {} · {} views", ad.category, ad.status, ad.view_count);
    if let Some(location) = &ad.location {
        println!("   Location: {}", location);
    }
    if !ad.tags.is_empty() {
        let shown = &ad.tags[..ad.tags.len().min(3)];
        println!("   Tags: {}", shown.join(", "));
    }
    println!("   ID: {}  Posted {}", ad.id, ad.created_date.format("%Y-%m-%d"));
    println!();
}

fn print_ad_details(ad: &ClassifiedAd) {
    println!("{}", ad.title);
    println!("{}", "=".repeat(ad.title.chars().count()));
    println!("Price: {}", format_price(ad.price));
    if let Some(discount) = ad.discount() {
        println!("Save {} off the original price", format_price(discount));
    }
    println!("Status: {}", ad.status);
    if let Some(condition) = ad.condition {
        println!("Condition: {}", condition);
    }
    println!("Category: {}", ad.category);
    if let Some(location) = &ad.location {
        println!("Location: {}", location);
    }
    println!("Posted by {} on {}", ad.created_by, ad.created_date.format("%Y-%m-%d"));
    println!("Views: {}", ad.view_count);
    println!();
    println!("{}", ad.description);
    if !ad.tags.is_empty() {
        println!();
        println!("Tags: {}", ad.tags.join(", "));
    }
    for image in &ad.images {
        println!("Image: {}", image);
    }
}

use clap::{Args, Parser, Subcommand};
use folio::article::{ArticleForm, ArticleId, Status};
use folio::category::{CategoryForm, CategoryId, CategoryTree};
use folio::gallery::{PhotoForm, PhotoId};
use folio::imaging::{self, DerivativeSpec, RustBackend};
use folio::site::{Site, SiteError};
use folio::types::{Caller, ImageInput, UploadedFile};
use folio::{config, output};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn version_string() -> &'static str {
    let hash = env!("FOLIO_GIT_HASH");
    if hash.is_empty() {
        env!("CARGO_PKG_VERSION")
    } else {
        // Leaked once at startup
        Box::leak(format!("{}@{hash}", env!("CARGO_PKG_VERSION")).into_boxed_str())
    }
}

#[derive(Parser)]
#[command(name = "folio")]
#[command(about = "Manage a portfolio's articles, categories and photo gallery")]
#[command(long_about = "\
Manage a portfolio's articles, categories and photo gallery

Everything lives under one site directory:

  site/
  ├── folio.toml        # Optional config (run 'folio gen-config')
  ├── folio.json        # Categories, articles and photos
  └── media/
      ├── articles/     # Thmb.<id>.<name>_compressed.webp
      └── gallery/      # <name>.jpg + <name>_compressed.webp

Uploaded images are compressed to a fixed width on save. Replacing an image
deletes the old files; deleting a row deletes its files.

Set RUST_LOG (e.g. RUST_LOG=folio=debug) to control log output on stderr.")]
#[command(version = version_string())]
struct Cli {
    /// Site directory
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print a stock folio.toml with all options documented
    GenConfig,
    /// Manage the category tree
    #[command(subcommand)]
    Category(CategoryCommand),
    /// Manage blog articles
    #[command(subcommand)]
    Article(ArticleCommand),
    /// Manage gallery photos
    #[command(subcommand)]
    Photo(PhotoCommand),
    /// Compress a single image file the way uploads are compressed
    Compress {
        input: PathBuf,
        /// Target width in pixels (default: article thumbnail width)
        #[arg(long)]
        width: Option<u32>,
        /// Directory to write the derivative into
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// List stored media no row refers to
    Orphans {
        /// Delete them as well
        #[arg(long)]
        remove: bool,
    },
}

#[derive(Subcommand)]
enum CategoryCommand {
    /// Add a category
    Add {
        #[arg(long)]
        title: String,
        #[arg(long)]
        slug: Option<String>,
        #[arg(long)]
        description: String,
        /// Slug of the parent category
        #[arg(long)]
        parent: Option<String>,
    },
    /// Edit a category, moving it if a new parent is given
    Edit {
        slug: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long = "new-slug")]
        new_slug: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, conflicts_with = "top_level")]
        parent: Option<String>,
        /// Make it a top-level category
        #[arg(long)]
        top_level: bool,
    },
    /// Delete a category and its subcategories
    Delete { slug: String },
    /// Show the category tree with published article counts
    Tree,
}

#[derive(Args)]
struct ArticleFields {
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    slug: Option<String>,
    /// Short description shown in listings
    #[arg(long)]
    short: Option<String>,
    /// Full description (HTML)
    #[arg(long, conflicts_with = "body_file")]
    body: Option<String>,
    /// Read the full description from a file
    #[arg(long)]
    body_file: Option<PathBuf>,
    /// Category slug
    #[arg(long)]
    category: Option<String>,
    /// Thumbnail image
    #[arg(long)]
    thumbnail: Option<PathBuf>,
    /// Save as draft
    #[arg(long, conflicts_with = "publish")]
    draft: bool,
    /// Publish
    #[arg(long)]
    publish: bool,
}

#[derive(Subcommand)]
enum ArticleCommand {
    /// Add an article
    Add(ArticleFields),
    /// Edit an article; unspecified fields keep their value
    Edit {
        slug: String,
        #[command(flatten)]
        fields: ArticleFields,
    },
    /// Delete an article and its thumbnail
    Delete { slug: String },
    /// List articles, newest first
    List {
        #[arg(long)]
        search: Option<String>,
        /// Only articles in this category
        #[arg(long)]
        category: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: usize,
        /// Include drafts
        #[arg(long)]
        all: bool,
    },
    /// Show one article
    Show {
        slug: String,
        /// Allow drafts
        #[arg(long)]
        all: bool,
    },
}

#[derive(Subcommand)]
enum PhotoCommand {
    /// Add a photo
    Add {
        #[arg(long)]
        title: String,
        #[arg(long)]
        caption: String,
        #[arg(long)]
        file: PathBuf,
    },
    /// Edit a photo; a new file replaces both stored images
    Edit {
        id: u64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        caption: Option<String>,
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Delete a photo and both of its files
    Delete { id: u64 },
    /// List photos, newest first
    List {
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::GenConfig => print!("{}", config::stock_config_toml()),
        Command::Category(cmd) => run_category(&cli.root, cmd)?,
        Command::Article(cmd) => run_article(&cli.root, cmd)?,
        Command::Photo(cmd) => run_photo(&cli.root, cmd)?,
        Command::Compress { input, width, out } => {
            let config = config::load_config(&cli.root)?;
            let spec = DerivativeSpec {
                width: width.unwrap_or(config.articles.thumbnail_width),
                ..config.article_spec()
            };
            let source = UploadedFile::from_path(&input)?;
            let derived = imaging::compress(&RustBackend::new(), &source, &spec)?;
            std::fs::create_dir_all(&out)?;
            let path = out.join(&derived.name);
            std::fs::write(&path, &derived.bytes)?;
            println!(
                "{} → {} ({}x{})",
                input.display(),
                path.display(),
                derived.width,
                derived.height
            );
        }
        Command::Orphans { remove } => {
            let site = Site::open(&cli.root)?;
            let keys = if remove {
                site.remove_orphans(Caller::Staff)?
            } else {
                site.orphaned_media()?
            };
            output::print_lines(&output::format_orphans(&keys, remove));
        }
    }
    Ok(())
}

/// Logs go to stderr so listings on stdout stay clean.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("folio=info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn category_id(tree: &CategoryTree, slug: &str) -> Result<CategoryId, SiteError> {
    tree.by_slug(slug)
        .map(|c| c.id)
        .ok_or_else(|| SiteError::CategoryNotFound(slug.to_string()))
}

fn run_category(root: &Path, cmd: CategoryCommand) -> Result<(), Box<dyn std::error::Error>> {
    let mut site = Site::open(root)?;
    match cmd {
        CategoryCommand::Add {
            title,
            slug,
            description,
            parent,
        } => {
            let parent = parent.map(|p| category_id(site.categories(), &p)).transpose()?;
            let id = site.create_category(
                Caller::Staff,
                CategoryForm {
                    title,
                    slug,
                    description,
                    parent,
                },
            )?;
            println!("Created category #{id}");
        }
        CategoryCommand::Edit {
            slug,
            title,
            new_slug,
            description,
            parent,
            top_level,
        } => {
            let id = category_id(site.categories(), &slug)?;
            let current = site
                .categories()
                .get(id)
                .cloned()
                .ok_or(SiteError::CategoryNotFound(slug))?;
            let parent = match (parent, top_level) {
                (Some(p), _) => Some(category_id(site.categories(), &p)?),
                (None, true) => None,
                (None, false) => current.parent,
            };
            site.update_category(
                Caller::Staff,
                id,
                CategoryForm {
                    title: title.unwrap_or(current.title),
                    slug: Some(new_slug.unwrap_or(current.slug)),
                    description: description.unwrap_or(current.description),
                    parent,
                },
            )?;
            println!("Updated category #{id}");
        }
        CategoryCommand::Delete { slug } => {
            let id = category_id(site.categories(), &slug)?;
            let removed = site.delete_category(Caller::Staff, id)?;
            println!("Deleted {} categories", removed.len());
        }
        CategoryCommand::Tree => {
            output::print_lines(&output::format_category_tree(&site.category_counts()));
        }
    }
    Ok(())
}

fn read_body(fields: &ArticleFields) -> std::io::Result<Option<String>> {
    match (&fields.body, &fields.body_file) {
        (Some(body), _) => Ok(Some(body.clone())),
        (None, Some(path)) => std::fs::read_to_string(path).map(Some),
        (None, None) => Ok(None),
    }
}

fn thumbnail_input(path: Option<&Path>) -> std::io::Result<ImageInput> {
    Ok(match path {
        Some(path) => ImageInput::Upload(UploadedFile::from_path(path)?),
        None => ImageInput::Keep,
    })
}

fn status_flag(fields: &ArticleFields) -> Option<Status> {
    if fields.draft {
        Some(Status::Draft)
    } else if fields.publish {
        Some(Status::Published)
    } else {
        None
    }
}

fn run_article(root: &Path, cmd: ArticleCommand) -> Result<(), Box<dyn std::error::Error>> {
    let mut site = Site::open(root)?;
    match cmd {
        ArticleCommand::Add(fields) => {
            let category = match &fields.category {
                Some(slug) => category_id(site.categories(), slug)?,
                None => return Err("--category is required".into()),
            };
            let form = ArticleForm {
                title: fields.title.clone().unwrap_or_default(),
                slug: fields.slug.clone(),
                short_description: fields.short.clone().unwrap_or_default(),
                full_description: read_body(&fields)?.unwrap_or_default(),
                status: status_flag(&fields).unwrap_or_default(),
                category,
            };
            let thumbnail = thumbnail_input(fields.thumbnail.as_deref())?;
            let id = site.create_article(Caller::Staff, form, thumbnail)?;
            let article = &site.store().articles[&id];
            println!("Created article #{id} ({})", article.slug);
            println!("    Thumbnail: {}", site.media_url(&article.thumbnail));
        }
        ArticleCommand::Edit { slug, fields } => {
            let current = site.article(Caller::Staff, &slug)?.clone();
            let category = match &fields.category {
                Some(slug) => category_id(site.categories(), slug)?,
                None => current.category,
            };
            let form = ArticleForm {
                title: fields.title.clone().unwrap_or(current.title),
                slug: Some(fields.slug.clone().unwrap_or(current.slug)),
                short_description: fields.short.clone().unwrap_or(current.short_description),
                full_description: read_body(&fields)?.unwrap_or(current.full_description),
                status: status_flag(&fields).unwrap_or(current.status),
                category,
            };
            let thumbnail = thumbnail_input(fields.thumbnail.as_deref())?;
            site.update_article(Caller::Staff, current.id, form, thumbnail)?;
            println!("Updated article #{}", current.id);
        }
        ArticleCommand::Delete { slug } => {
            let id: ArticleId = site.article(Caller::Staff, &slug)?.id;
            site.delete_article(Caller::Staff, id)?;
            println!("Deleted article #{id}");
        }
        ArticleCommand::List {
            search,
            category,
            page,
            all,
        } => {
            let caller = if all { Caller::Staff } else { Caller::Anonymous };
            let page = match category {
                Some(slug) => {
                    let (_, page) = site.articles_by_category(caller, &slug, page)?;
                    if search.is_some() {
                        tracing::warn!("--search is ignored with --category");
                    }
                    page
                }
                None => site.list_articles(caller, search.as_deref(), page)?,
            };
            let lines =
                output::format_article_list(&page, site.categories(), |k| site.media_url(k));
            output::print_lines(&lines);
        }
        ArticleCommand::Show { slug, all } => {
            let caller = if all { Caller::Staff } else { Caller::Anonymous };
            let article = site.article(caller, &slug)?;
            let lines = output::format_article_detail(
                article,
                site.categories(),
                &site.media_url(&article.thumbnail),
            );
            output::print_lines(&lines);
        }
    }
    Ok(())
}

fn run_photo(root: &Path, cmd: PhotoCommand) -> Result<(), Box<dyn std::error::Error>> {
    let mut site = Site::open(root)?;
    match cmd {
        PhotoCommand::Add {
            title,
            caption,
            file,
        } => {
            let upload = UploadedFile::from_path(&file)?;
            let id = site.create_photo(
                Caller::Staff,
                PhotoForm {
                    title,
                    content: caption,
                },
                upload,
            )?;
            println!("Created photo #{id}");
        }
        PhotoCommand::Edit {
            id,
            title,
            caption,
            file,
        } => {
            let id = PhotoId(id);
            let current = site.photo(id)?.clone();
            let form = PhotoForm {
                title: title.unwrap_or(current.title),
                content: caption.unwrap_or(current.content),
            };
            site.update_photo(Caller::Staff, id, form, thumbnail_input(file.as_deref())?)?;
            println!("Updated photo #{id}");
        }
        PhotoCommand::Delete { id } => {
            match site.delete_photo(Caller::Staff, PhotoId(id))? {
                Some(_) => println!("Deleted photo #{id}"),
                None => println!("No photo #{id}"),
            }
        }
        PhotoCommand::List { page } => {
            let page = site.list_photos(page)?;
            output::print_lines(&output::format_photo_list(&page, |k| site.media_url(k)));
        }
    }
    Ok(())
}

//! End-to-end file lifecycle against a real site directory.
//!
//! Uses the filesystem storage and the pure-Rust backend, so every upload is
//! actually decoded, resized and encoded. Images are generated in memory.

use folio::article::{ArticleForm, Status};
use folio::category::{CategoryForm, CategoryId};
use folio::gallery::PhotoForm;
use folio::imaging::RustBackend;
use folio::site::{Site, SiteError};
use folio::storage::{FileSystemStorage, MediaStorage};
use folio::types::{Caller, ImageInput, UploadedFile};
use image::{GenericImageView, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::path::Path;
use tempfile::TempDir;

fn jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 90])
    });
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Jpeg).unwrap();
    out.into_inner()
}

fn upload(name: &str, width: u32, height: u32) -> UploadedFile {
    UploadedFile::new(name, jpeg(width, height))
}

fn dimensions(path: &Path) -> (u32, u32) {
    image::open(path).unwrap().dimensions()
}

fn travel(site: &mut Site<FileSystemStorage, RustBackend>) -> CategoryId {
    site.create_category(
        Caller::Staff,
        CategoryForm {
            title: "Travel".into(),
            slug: None,
            description: "Trips".into(),
            parent: None,
        },
    )
    .unwrap()
}

fn article_form(title: &str, category: CategoryId) -> ArticleForm {
    ArticleForm {
        title: title.into(),
        slug: None,
        short_description: "Short".into(),
        full_description: "<p>Long</p>".into(),
        status: Status::Published,
        category,
    }
}

fn photo_form(title: &str) -> PhotoForm {
    PhotoForm {
        title: title.into(),
        content: "Caption".into(),
    }
}

// =============================================================================
// Articles
// =============================================================================

#[test]
fn article_thumbnail_follows_its_row() {
    let tmp = TempDir::new().unwrap();
    let media = tmp.path().join("media");
    let mut site = Site::open(tmp.path()).unwrap();
    let category = travel(&mut site);

    let id = site
        .create_article(
            Caller::Staff,
            article_form("Kyoto in autumn", category),
            ImageInput::Upload(upload("dawn.jpg", 1200, 800)),
        )
        .unwrap();
    let first = site.store().articles[&id].thumbnail.clone();
    assert_eq!(first, format!("articles/Thmb.{id}.dawn_compressed.webp"));
    assert_eq!(dimensions(&media.join(&first)), (600, 400));
    assert_eq!(site.media_url(&first), format!("/media/{first}"));

    // Reopening reads the same rows back
    let mut site = Site::open(tmp.path()).unwrap();
    assert_eq!(site.article(Caller::Anonymous, "kyoto-in-autumn").unwrap().id, id);

    site.update_article(
        Caller::Staff,
        id,
        article_form("Kyoto in autumn", category),
        ImageInput::Upload(upload("dusk.jpg", 900, 900)),
    )
    .unwrap();
    let second = site.store().articles[&id].thumbnail.clone();
    assert_eq!(second, format!("articles/Thmb.{id}.dusk_compressed.webp"));
    assert!(!media.join(&first).exists());
    assert_eq!(dimensions(&media.join(&second)), (600, 600));

    site.delete_article(Caller::Staff, id).unwrap();
    assert!(!media.join(&second).exists());
    assert!(site.orphaned_media().unwrap().is_empty());
}

#[test]
fn editing_text_only_keeps_the_thumbnail() {
    let tmp = TempDir::new().unwrap();
    let mut site = Site::open(tmp.path()).unwrap();
    let category = travel(&mut site);
    let id = site
        .create_article(
            Caller::Staff,
            article_form("Kyoto", category),
            ImageInput::Upload(upload("dawn.jpg", 800, 400)),
        )
        .unwrap();
    let before = site.store().articles[&id].clone();

    let mut form = article_form("Kyoto at night", category);
    form.status = Status::Draft;
    site.update_article(Caller::Staff, id, form, ImageInput::Keep)
        .unwrap();

    let after = &site.store().articles[&id];
    assert_eq!(after.thumbnail, before.thumbnail);
    assert_eq!(after.slug, before.slug);
    assert_eq!(after.time_create, before.time_create);
    assert!(tmp.path().join("media").join(&after.thumbnail).exists());
    assert!(matches!(
        site.article(Caller::Anonymous, &after.slug),
        Err(SiteError::ArticleNotFound(_))
    ));
}

#[test]
fn anonymous_callers_cannot_write() {
    let tmp = TempDir::new().unwrap();
    let mut site = Site::open(tmp.path()).unwrap();
    let category = travel(&mut site);
    let result = site.create_article(
        Caller::Anonymous,
        article_form("Kyoto", category),
        ImageInput::Upload(upload("dawn.jpg", 100, 100)),
    );
    assert!(matches!(result, Err(SiteError::LoginRequired)));
    assert!(site.storage().keys().unwrap().is_empty());
}

// =============================================================================
// Gallery
// =============================================================================

#[test]
fn gallery_photo_stores_original_and_derivative() {
    let tmp = TempDir::new().unwrap();
    let media = tmp.path().join("media");
    let mut site = Site::open(tmp.path()).unwrap();
    let original = upload("bay.jpg", 1400, 700);

    let id = site
        .create_photo(Caller::Staff, photo_form("Bay"), original.clone())
        .unwrap();
    let photo = site.photo(id).unwrap().clone();
    assert_eq!(photo.photo_full, "gallery/bay.jpg");
    assert_eq!(photo.photo_compressed.as_deref(), Some("gallery/bay_compressed.webp"));
    assert_eq!(std::fs::read(media.join("gallery/bay.jpg")).unwrap(), original.bytes);
    assert_eq!(
        dimensions(&media.join("gallery/bay_compressed.webp")),
        (700, 350)
    );

    // Same file name again: stored alongside, never overwritten
    let second = site
        .create_photo(Caller::Staff, photo_form("Bay again"), upload("bay.jpg", 300, 300))
        .unwrap();
    let other = site.photo(second).unwrap().clone();
    assert_ne!(other.photo_full, photo.photo_full);
    assert_eq!(std::fs::read(media.join("gallery/bay.jpg")).unwrap(), original.bytes);

    site.delete_photo(Caller::Staff, id).unwrap();
    assert!(!media.join("gallery/bay.jpg").exists());
    assert!(!media.join("gallery/bay_compressed.webp").exists());
    assert!(media.join(&other.photo_full).exists());

    let page = site.list_photos(1).unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].id, second);
}

#[test]
fn undecodable_upload_leaves_nothing_behind() {
    let tmp = TempDir::new().unwrap();
    let mut site = Site::open(tmp.path()).unwrap();
    let result = site.create_photo(
        Caller::Staff,
        photo_form("Broken"),
        UploadedFile::new("broken.jpg", b"not an image".to_vec()),
    );
    assert!(matches!(result, Err(SiteError::Hook(_))));
    assert!(site.store().photos.is_empty());
    assert!(site.storage().keys().unwrap().is_empty());
}

#[test]
fn gallery_rejects_disallowed_extension() {
    let tmp = TempDir::new().unwrap();
    let mut site = Site::open(tmp.path()).unwrap();
    let result = site.create_photo(Caller::Staff, photo_form("Web"), upload("bay.webp", 10, 10));
    match result {
        Err(SiteError::Invalid(errors)) => assert!(errors.has("photo_full")),
        other => panic!("expected validation error, got {other:?}"),
    }
}

// =============================================================================
// Configuration and maintenance
// =============================================================================

#[test]
fn site_config_is_read_from_folio_toml() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(
        tmp.path().join("folio.toml"),
        r#"
media_root = "uploads"
media_url = "https://cdn.example.com/"

[gallery]
compressed_width = 350
"#,
    )
    .unwrap();
    let mut site = Site::open(tmp.path()).unwrap();
    assert_eq!(site.config().articles.thumbnail_width, 600);

    let id = site
        .create_photo(Caller::Staff, photo_form("Bay"), upload("bay.jpg", 700, 700))
        .unwrap();
    let compressed = site.photo(id).unwrap().photo_compressed.clone().unwrap();
    assert_eq!(
        dimensions(&tmp.path().join("uploads").join(&compressed)),
        (350, 350)
    );
    assert_eq!(
        site.media_url(&compressed),
        "https://cdn.example.com/gallery/bay_compressed.webp"
    );
}

#[test]
fn invalid_config_refuses_to_open() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("folio.toml"), "[gallery]\nper_page = 0\n").unwrap();
    assert!(matches!(Site::open(tmp.path()), Err(SiteError::Config(_))));
}

#[test]
fn stray_files_are_reported_and_removed() {
    let tmp = TempDir::new().unwrap();
    let mut site = Site::open(tmp.path()).unwrap();
    site.create_photo(Caller::Staff, photo_form("Bay"), upload("bay.jpg", 50, 50))
        .unwrap();
    let stray = tmp.path().join("media/gallery/stray.jpg");
    std::fs::write(&stray, b"left over").unwrap();

    assert_eq!(site.orphaned_media().unwrap(), vec!["gallery/stray.jpg"]);
    assert!(matches!(
        site.remove_orphans(Caller::Anonymous),
        Err(SiteError::LoginRequired)
    ));
    assert_eq!(
        site.remove_orphans(Caller::Staff).unwrap(),
        vec!["gallery/stray.jpg"]
    );
    assert!(!stray.exists());
    assert!(tmp.path().join("media/gallery/bay.jpg").exists());
}

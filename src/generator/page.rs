use crate::generator::{IMAGE_DIR, PAGE_DIR, page_stem};
use crate::transform::TransformedImage;

/// One package page: a markup document wrapping exactly one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// 0-based position in the spine.
    pub index: usize,
    pub title: String,
    /// Markup file name, e.g. `page_00001.xhtml`.
    pub file_name: String,
    pub markup: String,
    pub image: TransformedImage,
}

impl Page {
    /// Package-relative path of the markup document.
    pub fn href(&self) -> String {
        format!("{}/{}", PAGE_DIR, self.file_name)
    }

    /// Package-relative path under which the image is registered.
    pub fn image_href(&self) -> String {
        format!("{}/{}", IMAGE_DIR, self.image.file_name)
    }

    /// Reference to the image as written in the markup, relative to [`Page::href`].
    pub fn image_src(&self) -> String {
        format!("../{}", self.image_href())
    }
}

/// Wraps one transformed image in a full-viewport XHTML page.
///
/// The markup's image reference and [`Page::image_href`] are both built from
/// `image.file_name`, so a rendered page always points at its own resource.
pub fn render_page(index: usize, image: TransformedImage) -> Page {
    const TEMPLATE: &str = include_str!("../../templates/Page.xhtml");

    let title = format!("Page {}", index + 1);
    let mut page = Page {
        index,
        file_name: format!("{}.xhtml", page_stem(index)),
        title,
        markup: String::new(),
        image,
    };

    page.markup = TEMPLATE
        .replace("%title%", &escape_xml(&page.title))
        .replace("%alt%", &escape_xml(&page.title))
        .replace("%src%", &escape_xml(&page.image_src()))
        .replace("%width%", &page.image.width.to_string())
        .replace("%height%", &page.image.height.to_string());
    page
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

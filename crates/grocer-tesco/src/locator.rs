use anyhow::{anyhow, Result};
use scraper::{ElementRef, Html, Selector};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Read {
    /// The text nodes directly owned by the matched elements
    Text,
    /// An attribute of the matched elements
    Attr(&'static str),
}

/// A CSS selector and what to read from the elements it matches.
#[derive(Debug, Clone)]
pub struct Locator {
    selector: Selector,
    read: Read,
}

impl Locator {
    pub fn new(css: &str, read: Read) -> Result<Self> {
        let selector =
            Selector::parse(css).map_err(|e| anyhow!("Invalid selector `{css}` got: {e:?}"))?;
        Ok(Self { selector, read })
    }

    pub fn text(css: &str) -> Result<Self> {
        Self::new(css, Read::Text)
    }

    pub fn attr(css: &str, name: &'static str) -> Result<Self> {
        Self::new(css, Read::Attr(name))
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Every value in document order.
    pub fn all(&self, html: &Html) -> Vec<String> {
        html.select(&self.selector)
            .flat_map(|elem| self.values(elem))
            .collect()
    }

    /// The first value in document order.
    pub fn first(&self, html: &Html) -> Option<String> {
        html.select(&self.selector)
            .find_map(|elem| self.values(elem).into_iter().next())
    }

    /// Number of matched elements.
    pub fn count(&self, html: &Html) -> usize {
        html.select(&self.selector).count()
    }

    fn values(&self, elem: ElementRef) -> Vec<String> {
        match self.read {
            Read::Text => own_texts(elem),
            Read::Attr(name) => elem.value().attr(name).map(String::from).into_iter().collect(),
        }
    }
}

/// Non blank text nodes that are direct children of `elem`.
pub fn own_texts(elem: ElementRef) -> Vec<String> {
    elem.children()
        .filter_map(|node| node.value().as_text())
        .map(|text| text.to_string())
        .filter(|text| !text.trim().is_empty())
        .collect()
}

/// The first locator yielding a value wins.
pub fn try_in_order(html: &Html, locators: &[Locator]) -> Option<String> {
    locators.iter().find_map(|locator| locator.first(html))
}

/// Resolves a link found on the site against its origin.
pub fn resolve(origin: &Url, href: &str) -> Result<String> {
    Ok(origin
        .join(href.trim())
        .map_err(|e| anyhow!("Couldn't resolve {href:?} against {origin} got: {e}"))?
        .to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> Html {
        Html::parse_document(
            r#"
            <div id="a">
                <p>one<span>inner</span>two</p>
                <p>
                    <span>only child</span>
                </p>
                <a href="/groceries/en-GB/products/123">link</a>
            </div>
            "#,
        )
    }

    #[test]
    fn text_reads_own_text_nodes_only() {
        let html = page();
        let locator = Locator::text("#a > p:nth-of-type(1)").unwrap();
        assert_eq!(locator.all(&html), vec!["one", "two"]);
        assert_eq!(locator.first(&html).as_deref(), Some("one"));
    }

    #[test]
    fn blank_text_is_absent() {
        let html = page();
        let locator = Locator::text("#a > p:nth-of-type(2)").unwrap();
        assert_eq!(locator.first(&html), None);
    }

    #[test]
    fn try_in_order_falls_back() {
        let html = page();
        let locators = [
            Locator::text("#a > p:nth-of-type(2)").unwrap(),
            Locator::text("#a > p:nth-of-type(2) > span").unwrap(),
        ];
        assert_eq!(try_in_order(&html, &locators).as_deref(), Some("only child"));
    }

    #[test]
    fn attr_and_resolve() {
        let html = page();
        let href = Locator::attr("#a a", "href").unwrap().first(&html).unwrap();
        let origin = Url::parse("https://www.tesco.com").unwrap();
        assert_eq!(
            resolve(&origin, &href).unwrap(),
            "https://www.tesco.com/groceries/en-GB/products/123"
        );
    }

    #[test]
    fn invalid_selector_is_an_error() {
        assert!(Locator::text("<failing selector>").is_err());
    }
}

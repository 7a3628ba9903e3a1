use std::collections::BTreeMap;

use anyhow::Result;
use scraper::Html;
use url::Url;

use crate::locator::{own_texts, resolve, Locator};
use crate::record::{ProductRecord, Recommendation};
use crate::reviews::ReviewChain;
use crate::structured::{self, ProductMeta};

const TILES: &str = "div.recommender__wrapper > div.product-tile-wrapper";

pub struct Product {
    description: [Locator; 4],
    manufacturer_address: Locator,
    return_address: Locator,
    net_contents: Locator,
    tiles: Locator,
    tile_link: Locator,
}

impl Product {
    pub fn new() -> Result<Self> {
        Ok(Self {
            description: [
                Locator::text("div#product-marketing li")?,
                Locator::text("div#brand-marketing li")?,
                Locator::text("div#other-information li")?,
                Locator::text("div#pack-size li")?,
            ],
            manufacturer_address: Locator::text("div#manufacturer-address li")?,
            return_address: Locator::text("div#return-address li")?,
            net_contents: Locator::text("div#net-contents p")?,
            tiles: Locator::text(TILES)?,
            tile_link: Locator::text("h3 > a")?,
        })
    }

    /// Builds the record of the product page `html`, taking over the gathered reviews.
    pub fn extract(
        &self,
        html: &Html,
        url: &str,
        chain: ReviewChain,
        origin: &Url,
    ) -> Result<ProductRecord> {
        let meta = ProductMeta::from_entries(&structured::entries(html)?)?;
        let product_url = chain.product_url().unwrap_or(url).to_string();

        Ok(ProductRecord {
            description: self
                .description
                .iter()
                .flat_map(|locator| locator.all(html))
                .collect(),
            manufacturer_address: self.manufacturer_address.all(html).concat(),
            return_address: self.return_address.all(html).concat(),
            net_contents: self.net_contents.all(html).concat(),
            product_id: meta.id,
            product_url,
            image: meta.image,
            title: meta.title,
            category: meta.category,
            price: meta.price,
            reviews: chain.into_reviews(),
            recommended_products: self.recommendations(html, origin)?,
        })
    }

    fn recommendations(&self, html: &Html, origin: &Url) -> Result<BTreeMap<u32, Recommendation>> {
        let mut recommendations = BTreeMap::new();
        for (i, tile) in (1..).zip(html.select(self.tiles.selector())) {
            let link = tile.select(self.tile_link.selector()).next();
            let title = link.and_then(|a| own_texts(a).into_iter().next());
            let url = link
                .and_then(|a| a.value().attr("href"))
                .map(|href| resolve(origin, href))
                .transpose()?;
            recommendations.insert(i, Recommendation { title, url });
        }
        Ok(recommendations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Review, Stars};

    fn product_page(body: &str) -> Html {
        Html::parse_document(&format!(
            r#"<html><head><script type="application/ld+json">[
                {{"@type": "Organization"}},
                {{"@type": "BreadcrumbList"}},
                {{"@type": "Product", "sku": "301234567", "name": "Whiskas Tuna in Jelly",
                  "image": "https://digitalcontent.api.tesco.com/1.jpeg",
                  "offers": {{"@type": "Offer", "price": "3.50", "priceCurrency": "GBP"}}}}
            ]</script></head><body>{body}</body></html>"#
        ))
    }

    fn origin() -> Url {
        Url::parse("https://www.tesco.com").unwrap()
    }

    #[test]
    fn description_fragments_are_concatenated() {
        let html = product_page(
            r#"<div id="product-marketing"><ul>
                <li>Keep refrigerated.</li>
                <li>Suitable for freezing.</li>
            </ul></div>"#,
        );
        let record = Product::new()
            .unwrap()
            .extract(&html, "https://www.tesco.com/p", ReviewChain::default(), &origin())
            .unwrap();

        assert_eq!(record.description, "Keep refrigerated.Suitable for freezing.");
        assert_eq!(record.manufacturer_address, "");
        assert_eq!(record.product_id, 301234567);
        assert_eq!(record.price, 3.5);
        assert_eq!(record.title, "Whiskas Tuna in Jelly");
        assert_eq!(record.category, "Product");
        assert_eq!(record.product_url, "https://www.tesco.com/p");
    }

    #[test]
    fn description_regions_keep_their_order() {
        let html = product_page(
            r#"<div id="pack-size"><ul><li>4</li></ul></div>
            <div id="brand-marketing"><ul><li>B</li></ul></div>
            <div id="product-marketing"><ul><li>A</li></ul></div>
            <div id="other-information"><ul><li>C</li></ul></div>
            <div id="manufacturer-address"><ul><li>Mars UK,</li><li>Melton Mowbray</li></ul></div>
            <div id="return-address"><ul><li>Freepost</li></ul></div>
            <div id="net-contents"><p>12 x 85g</p></div>"#,
        );
        let record = Product::new()
            .unwrap()
            .extract(&html, "https://www.tesco.com/p", ReviewChain::default(), &origin())
            .unwrap();

        assert_eq!(record.description, "ABC4");
        assert_eq!(record.manufacturer_address, "Mars UK,Melton Mowbray");
        assert_eq!(record.return_address, "Freepost");
        assert_eq!(record.net_contents, "12 x 85g");
    }

    #[test]
    fn recommendations_are_resolved() {
        let html = product_page(
            r#"<div class="recommender__wrapper">
                <div class="product-tile-wrapper"><h3><a href="/groceries/en-GB/products/123">Felix Pouches</a></h3></div>
                <div class="product-tile-wrapper"><h3><span>No link</span></h3></div>
            </div>"#,
        );
        let record = Product::new()
            .unwrap()
            .extract(&html, "https://www.tesco.com/p", ReviewChain::default(), &origin())
            .unwrap();

        assert_eq!(record.recommended_products.len(), 2);
        assert_eq!(
            record.recommended_products[&1],
            Recommendation {
                title: Some("Felix Pouches".into()),
                url: Some("https://www.tesco.com/groceries/en-GB/products/123".into()),
            }
        );
        assert_eq!(
            record.recommended_products[&2],
            Recommendation {
                title: None,
                url: None
            }
        );
    }

    #[test]
    fn reviews_and_canonical_url_come_from_the_chain() {
        let html = product_page("");
        let chain = ReviewChain::default()
            .anchored("https://www.tesco.com/groceries/en-GB/products/301234567")
            .with_page(vec![Review {
                title: Some("Cat loves it".into()),
                author: None,
                date: None,
                text: None,
                stars: Stars::Rated(5),
            }]);
        let record = Product::new()
            .unwrap()
            .extract(&html, "https://www.tesco.com/other", chain, &origin())
            .unwrap();

        assert_eq!(
            record.product_url,
            "https://www.tesco.com/groceries/en-GB/products/301234567"
        );
        assert_eq!(record.reviews.len(), 1);
        assert_eq!(record.reviews[&1].stars, Stars::Rated(5));
    }

    #[test]
    fn page_without_sku_fails() {
        let html = Html::parse_document(
            r#"<html><head><script type="application/ld+json">[{"@type": "WebSite"}]</script></head></html>"#,
        );
        let err = Product::new()
            .unwrap()
            .extract(&html, "https://www.tesco.com/p", ReviewChain::default(), &origin())
            .unwrap_err();
        assert!(err.to_string().contains("sku"));
    }
}

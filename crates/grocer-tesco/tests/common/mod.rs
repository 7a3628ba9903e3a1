#![allow(dead_code)]

/// A category listing page linking to `products` by root-relative URL.
pub fn listing_page(products: &[u64], next: Option<&str>) -> String {
    let items: Vec<String> = products
        .iter()
        .enumerate()
        .map(|(i, id)| {
            format!(
                r#"{{"@type": "ListItem", "position": {}, "url": "/groceries/en-GB/products/{id}"}}"#,
                i + 1
            )
        })
        .collect();
    let next = next
        .map(|href| format!(r#"<link rel="next" href="{href}">"#))
        .unwrap_or_default();
    format!(
        r#"<!DOCTYPE html><html><head>{next}
        <script type="application/ld+json">[
            {{"@context": "http://schema.org", "@type": "WebSite", "url": "https://www.tesco.com/"}},
            {{"@type": "BreadcrumbList", "itemListElement": [{{"@type": "ListItem", "position": 1, "item": {{"@id": "/groceries/", "name": "Groceries"}}}}]}},
            {{"@type": "ItemList", "itemListElement": [{}]}}
        ]</script></head><body><ul class="product-list"></ul></body></html>"#,
        items.join(",")
    )
}

/// A review section as rendered on product pages. `author_in_p` renders the older
/// markup where the author is plain paragraph text and the date sits in the next one.
pub fn review_section(n: u32, author_in_p: bool) -> String {
    if author_in_p {
        format!(
            r#"<section class="sc-dNLxif dUMnMc"><div><span>Rated {stars} out of 5 stars</span></div><h4>Review {n}</h4><p>Author {n}</p><p><span>0{stars}/05/2020</span></p><p>Text {n}</p></section>"#,
            stars = n % 5 + 1
        )
    } else {
        format!(
            r#"<section class="sc-dNLxif dUMnMc"><div><span>Rated {stars} out of 5 stars</span></div><h4>Review {n}</h4><p><span>Author {n}</span><span>0{stars}/05/2020</span></p><p>Text {n}</p></section>"#,
            stars = n % 5 + 1
        )
    }
}

/// A product page showing reviews `first..=last`, with an optional next reviews page.
pub fn product_page(id: u64, first: u32, last: u32, next: Option<&str>) -> String {
    let sections: String = (first..=last)
        .map(|n| review_section(n, n % 2 == 0))
        .collect();
    let next = next
        .map(|href| {
            format!(
                r#"<a class="sc-ktHwxA iYjymA styled__TextButtonLink-ipdqot-0 GMOgz" href="{href}">Show more reviews</a>"#
            )
        })
        .unwrap_or_default();
    format!(
        r#"<!DOCTYPE html><html><head>
        <script type="application/ld+json">[
            {{"@context": "http://schema.org", "@type": "WebSite"}},
            {{"@type": "BreadcrumbList", "itemListElement": []}},
            {{"@type": "Product", "sku": "{id}", "name": "Product {id}",
              "image": "https://digitalcontent.api.tesco.com/v2/media/ghs/{id}.jpeg",
              "offers": {{"@type": "Offer", "priceCurrency": "GBP", "price": "2.50"}}}}
        ]</script></head><body>
        <div id="product-marketing"><ul><li>Keep refrigerated.</li><li>Suitable for freezing.</li></ul></div>
        <div id="manufacturer-address"><ul><li>Tesco Stores Ltd.,</li><li>Welwyn Garden City</li></ul></div>
        <div id="net-contents"><p>500g</p></div>
        <div class="recommender__wrapper">
            <div class="product-tile-wrapper"><h3><a href="/groceries/en-GB/products/{rec}">Product {rec}</a></h3></div>
        </div>
        <div id="review-data"><article class="content">{sections}</article>{next}</div>
        </body></html>"#,
        rec = id + 1000
    )
}

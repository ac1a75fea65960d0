//! Indexing merged links and searching them back.
use datahtml::site::links_mapping;
use datahtml::sitemap::SitemapLink;
use datahtml::storage::{SearchLink, UrlIndex};
use pretty_assertions::assert_eq;

fn sitemap_link(url: &str) -> SitemapLink {
    SitemapLink {
        fullurl: url.to_owned(),
        lastmod: None,
    }
}

#[tokio::test]
async fn test_index_merged_links_by_path_words() {
    let merged = links_mapping(
        &[
            sitemap_link("https://www.diario.com.ar/politica/elecciones-en-cordoba"),
            sitemap_link("https://www.diario.com.ar/deportes/river-campeon"),
            sitemap_link("https://www.otrodiario.com/politica/elecciones-nacionales"),
            sitemap_link("not a url"),
        ],
        None,
        &[],
    );
    assert_eq!(merged.len(), 3);

    let links: Vec<SearchLink> = merged
        .iter()
        .map(|l| SearchLink::parse(&l.fullurl, &l.text).unwrap())
        .collect();

    let index = UrlIndex::open(":memory:").await.unwrap();
    assert_eq!(index.build(&links).await.unwrap(), 3);

    let found = index.search("Elecciones", None, 10).await.unwrap();
    assert_eq!(found.len(), 2);

    let found = index
        .search("elecciones", Some("diario.com.ar"), 10)
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(
        found[0].url.fullurl,
        "https://www.diario.com.ar/politica/elecciones-en-cordoba"
    );
    assert_eq!(found[0].text, "politica elecciones en cordoba");

    assert_eq!(index.search("campeón river", None, 10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_rebuilding_twice_does_not_duplicate() {
    let index = UrlIndex::open(":memory:").await.unwrap();
    let link = SearchLink::parse("https://example.com/a", "Ñandú y pingüino").unwrap();

    index.build(&[link.clone()]).await.unwrap();
    index.build(&[link]).await.unwrap();
    assert_eq!(index.len().await.unwrap(), 1);

    assert_eq!(index.rebuild().await.unwrap(), 1);
    let found = index.search("nandu pinguino", None, 5).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].text, "Nandu y pinguino");
}

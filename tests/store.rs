use camino::Utf8PathBuf;

use kira_metadata_extract::domain::{GeoSeriesAccession, Pmid};
use kira_metadata_extract::store::Store;

#[test]
fn layout_paths() {
    let store = Store::new().unwrap();
    let gse: GeoSeriesAccession = "GSE102902".parse().unwrap();
    let pmid: Pmid = "31000000".parse().unwrap();

    assert!(store.cache_root().ends_with("kira-metadata-extract"));
    assert!(store.soft_path(&gse).ends_with("soft/GSE102902_family.soft"));
    assert!(store.pubmed_path(&pmid).ends_with("pubmed/31000000.html"));
    assert!(
        store
            .metadata_path("soft", "GSE102902")
            .to_string()
            .contains("metadata/soft/")
    );
}

#[test]
fn cached_text_round_trips_with_sidecar() {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    let store = Store::new_with_root(root);
    let gse: GeoSeriesAccession = "GSE1".parse().unwrap();
    let path = store.soft_path(&gse);

    assert_eq!(Store::read_text(&path).unwrap(), None);
    store
        .cache_text(&path, "soft", gse.as_str(), "geo", "^SERIES = GSE1\n")
        .unwrap();
    assert_eq!(
        Store::read_text(&path).unwrap().as_deref(),
        Some("^SERIES = GSE1\n")
    );

    let metadata = Store::read_metadata(&store.metadata_path("soft", "GSE1"))
        .unwrap()
        .unwrap();
    assert_eq!(metadata.source, "geo");
    assert_eq!(metadata.id, "GSE1");
    assert_eq!(metadata.resolved_path, path.to_string());
    assert!(metadata.tool.starts_with("kira-mx/"));
}

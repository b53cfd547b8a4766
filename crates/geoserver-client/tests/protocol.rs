//! REST protocol tests against the mock GeoServer.

use geoserver_client::{
    Coverage, CoverageStore, GeoServerClient, GeoServerConfig, GeoServerError, StoreType,
    UploadKind, WorkspaceOutcome, SLD_CONTENT_TYPE,
};
use publish_common::EpsgCode;
use test_utils::{geoserver, scratch_dir, Method, MockGeoServer};

fn client_for(mock: &MockGeoServer) -> GeoServerClient {
    GeoServerClient::new(GeoServerConfig::new(
        mock.host(),
        mock.port(),
        geoserver::USER,
        geoserver::PASSWORD,
        geoserver::WORKSPACE,
    ))
    .unwrap()
}

#[tokio::test]
async fn test_workspace_creation_is_idempotent() {
    let mock = MockGeoServer::start().await;
    let client = client_for(&mock);

    mock.respond_once(Method::POST, "workspaces", 201, "");
    assert_eq!(client.create_workspace().await.unwrap(), WorkspaceOutcome::Created);

    mock.respond_once(Method::POST, "workspaces", 409, "Workspace 'test_ws' already exists");
    assert_eq!(
        client.create_workspace().await.unwrap(),
        WorkspaceOutcome::AlreadyExists
    );

    mock.respond_once(Method::POST, "workspaces", 401, "");
    assert_eq!(
        client.create_workspace().await.unwrap(),
        WorkspaceOutcome::AlreadyExists
    );

    let requests = mock.requests_to(Method::POST, "workspaces");
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[0].json()["workspace"]["name"], "test_ws");
    assert_eq!(requests[0].content_type.as_deref(), Some("application/json"));
    assert!(requests[0]
        .authorization
        .as_deref()
        .is_some_and(|a| a.starts_with("Basic ")));
}

#[tokio::test]
async fn test_workspace_creation_other_status_is_fatal() {
    let mock = MockGeoServer::start().await;
    let client = client_for(&mock);
    mock.respond(Method::POST, "workspaces", 500, "boom");

    let err = client.create_workspace().await.unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert!(err.to_string().contains("boom"));
}

#[tokio::test]
async fn test_store_creation_requires_201() {
    let mock = MockGeoServer::start().await;
    let client = client_for(&mock);

    let store = CoverageStore::new("lst_coverage_7", StoreType::ImageMosaic, "test_ws", "/geodata/lst");
    client.create_coverage_store(store.clone()).await.unwrap();

    let sent = mock.requests_to(Method::POST, "workspaces/test_ws/coveragestores");
    assert_eq!(sent[0].json()["coverageStore"]["type"], "ImageMosaic");
    assert_eq!(sent[0].json()["coverageStore"]["url"], "file:/geodata/lst");

    mock.respond(Method::POST, "workspaces/test_ws/coveragestores", 200, "");
    let err = client.create_coverage_store(store).await.unwrap_err();
    assert!(matches!(err, GeoServerError::UnexpectedStatus { status: 200, .. }));
}

#[tokio::test]
async fn test_mosaic_upload_sends_zip() {
    let mock = MockGeoServer::start().await;
    let client = client_for(&mock);
    let dir = scratch_dir();
    let archive = b"PK\x03\x04fake".to_vec();
    let path = dir.path().join("mosaic.zip");
    std::fs::write(&path, &archive).unwrap();

    client
        .upload_store_file("lst_coverage_7", UploadKind::ImageMosaic, &path, None)
        .await
        .unwrap();

    let endpoint = "workspaces/test_ws/coveragestores/lst_coverage_7/file.imagemosaic";
    let sent = mock.requests_to(Method::PUT, endpoint);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].content_type.as_deref(), Some("application/zip"));
    assert_eq!(sent[0].body, archive);

    // The upload endpoint answers 201 on success; 200 is not accepted.
    mock.respond(Method::PUT, endpoint, 200, "");
    let err = client
        .upload_store_file("lst_coverage_7", UploadKind::ImageMosaic, &path, None)
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(200));
}

#[tokio::test]
async fn test_geotiff_upload_names_coverage() {
    let mock = MockGeoServer::start().await;
    let client = client_for(&mock);
    let dir = scratch_dir();
    let path = dir.path().join("test_1.tif");
    std::fs::write(&path, [1u8, 2, 3]).unwrap();

    client
        .upload_store_file("test_1_store", UploadKind::GeoTiff, &path, Some("test_1"))
        .await
        .unwrap();

    let sent = mock.requests_to(
        Method::PUT,
        "workspaces/test_ws/coveragestores/test_1_store/file.geotiff",
    );
    assert_eq!(sent[0].content_type.as_deref(), Some("image/tiff"));
    assert_eq!(sent[0].query.as_deref(), Some("coverageName=test_1"));
    assert_eq!(sent[0].body, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_upload_of_missing_file_sends_nothing() {
    let mock = MockGeoServer::start().await;
    let client = client_for(&mock);
    let dir = scratch_dir();

    let err = client
        .upload_store_file("cs", UploadKind::GeoTiff, &dir.path().join("gone.tif"), None)
        .await
        .unwrap_err();

    assert!(matches!(err, GeoServerError::Io(_)));
    assert!(mock.requests().is_empty());
}

#[tokio::test]
async fn test_coverage_create_and_update_status_codes() {
    let mock = MockGeoServer::start().await;
    let client = client_for(&mock);
    let coverage = Coverage::granule_layer("lst", "test_ws", "cs", EpsgCode(3358), true);

    client.create_coverage("cs", coverage.clone()).await.unwrap();
    client.update_coverage("cs", "cs", coverage.clone()).await.unwrap();

    let update_path = "workspaces/test_ws/coveragestores/cs/coverages/cs";
    let update = mock.requests_to(Method::PUT, update_path).remove(0);
    assert_eq!(update.json()["coverage"]["name"], "lst");

    mock.respond(Method::PUT, update_path, 500, "No such coverage");
    let err = client.update_coverage("cs", "cs", coverage).await.unwrap_err();
    match err {
        GeoServerError::UnexpectedStatus { status, body, .. } => {
            assert_eq!(status, 500);
            assert_eq!(body, "No such coverage");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_attach_style_sequence() {
    let mock = MockGeoServer::start().await;
    let client = client_for(&mock);

    client
        .attach_style("lst", "<StyledLayerDescriptor/>".to_string())
        .await
        .unwrap();

    assert_eq!(
        mock.request_lines(),
        vec![
            "POST workspaces/test_ws/styles",
            "PUT workspaces/test_ws/styles/lst",
            "GET workspaces/test_ws/layers/lst",
            "PUT workspaces/test_ws/layers/lst",
        ]
    );

    let requests = mock.requests();
    assert_eq!(requests[0].json()["style"]["filename"], "lst.sld");
    assert_eq!(requests[1].content_type.as_deref(), Some(SLD_CONTENT_TYPE));
    assert_eq!(requests[1].body_text(), "<StyledLayerDescriptor/>");

    let layer = requests[3].json();
    assert_eq!(layer["layer"]["defaultStyle"]["name"], "lst");
    assert!(layer["layer"]["defaultStyle"]["href"]
        .as_str()
        .unwrap()
        .ends_with("/geoserver/rest/workspaces/test_ws/styles/lst.json"));
    assert_eq!(layer["layer"]["type"], "RASTER");
}

#[tokio::test]
async fn test_attach_style_aborts_on_failed_creation() {
    let mock = MockGeoServer::start().await;
    let client = client_for(&mock);
    mock.respond(Method::POST, "workspaces/test_ws/styles", 403, "forbidden");

    assert!(client.attach_style("lst", String::new()).await.is_err());
    assert_eq!(mock.requests().len(), 1);
}

#[tokio::test]
async fn test_layer_resource_lookup() {
    let mock = MockGeoServer::start().await;
    let client = client_for(&mock);

    let layer = client.get_layer("elevation").await.unwrap();
    let coverage = client.get_layer_resource(&layer).await.unwrap();
    assert_eq!(coverage["coverage"]["nativeCoverageName"], "elevation");

    mock.respond(Method::GET, "workspaces/test_ws/layers/missing", 404, "No such layer");
    assert_eq!(client.get_layer("missing").await.unwrap_err().status(), Some(404));
}

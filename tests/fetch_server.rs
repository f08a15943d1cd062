//! HTTP fetch backend against a local server
#![cfg(feature = "fetch")]

use rfclone::model::SectionType;
use rfclone::render::fetch::HttpRenderer;
use rfclone::render::{MarkupRenderer, PageRenderer};
use rfclone::{analyzer, clone_page, artifacts::ArtifactStore, CloneConfig, Error};
use tiny_http::{Header, Response, Server};

const LANDING: &str = include_str!("fixtures/landing.html");

/// Serve `count` requests in the background and return the base URL
fn serve(count: usize) -> String {
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr();
    std::thread::spawn(move || {
        for _ in 0..count {
            let Ok(request) = server.recv() else { return };
            let response = match request.url() {
                "/" => Response::from_string(LANDING)
                    .with_header("Content-Type: text/html; charset=utf-8".parse::<Header>().unwrap()),
                "/moved" => Response::from_string("")
                    .with_status_code(302)
                    .with_header("Location: /".parse::<Header>().unwrap()),
                _ => Response::from_string("Not Found").with_status_code(404),
            };
            let _ = request.respond(response);
        }
    });
    format!("http://{}", addr)
}

#[test]
fn test_fetched_page_analyzes_like_local_markup() {
    let base = serve(1);
    let mut renderer = HttpRenderer::new(&CloneConfig::default()).unwrap();
    let page = renderer.render_url(&format!("{}/", base)).unwrap();

    assert_eq!(page.title, "Acme Plans");
    assert_eq!(page.description, "Pick the Acme plan that fits your team");
    assert!(page.screenshots.is_none());
    assert!(page.computed_styles.is_empty());

    let model = analyzer::analyze(&page, &CloneConfig::default());
    assert_eq!(model.sections.len(), 5);
    assert_eq!(model.sections[2].section_type, SectionType::OfferList);
    let signup = &model.sections[1].children[3];
    assert_eq!(signup.href.as_deref(), Some(format!("{}/signup", base).as_str()));
}

#[test]
fn test_redirect_reports_final_url() {
    let base = serve(2);
    let mut renderer = HttpRenderer::new(&CloneConfig::default()).unwrap();
    let page = renderer.render_url(&format!("{}/moved", base)).unwrap();
    assert_eq!(page.url, format!("{}/", base));
    assert_eq!(page.title, "Acme Plans");
}

#[test]
fn test_http_error_is_a_load_error() {
    let base = serve(1);
    let mut renderer = HttpRenderer::new(&CloneConfig::default()).unwrap();
    let err = renderer.render_url(&format!("{}/missing", base)).unwrap_err();
    assert!(matches!(err, Error::LoadError(_)));
}

#[test]
fn test_clone_without_screenshots_aborts() {
    let base = serve(1);
    let mut renderer = HttpRenderer::new(&CloneConfig::default()).unwrap();
    assert!(renderer.render_markup("<p>x</p>").is_err());
    let err = clone_page(&mut renderer, &format!("{}/", base), &CloneConfig::default(), &ArtifactStore::disabled())
        .unwrap_err();
    assert!(matches!(err, Error::LoadError(_)));
}

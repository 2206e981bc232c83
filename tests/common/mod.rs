#![allow(dead_code)]

pub use assetflow_test_utils::builders;
pub use assetflow_test_utils::fake_executor;
pub use assetflow_test_utils::{init_tracing, with_timeout, RecordingReload};

use assetflow::fs::mock::MockFileSystem;

/// A small project in the default `assets/src` layout, rooted at `.`.
pub fn sample_project() -> MockFileSystem {
    let fs = MockFileSystem::new();

    fs.add_file(
        "./assets/src/index.html",
        "<html>\n<body>\n  //= template/header.html\n  <main>home</main>\n</body>\n</html>\n",
    );
    fs.add_file("./assets/src/template/header.html", "<header>\n  <h1>Site</h1>\n</header>\n");

    fs.add_file(
        "./assets/src/style/main.scss",
        "@import \"partials/vars\";\n\nbody {\n  color: $primary;\n  user-select: none;\n}\n",
    );
    fs.add_file("./assets/src/style/partials/_vars.scss", "$primary: #336699;\n");

    fs.add_file(
        "./assets/src/js/main.js",
        "//= lib/util.js\nfunction main() {\n  var greeting = 'hello';\n  return greet(greeting);\n}\nmain();\n",
    );
    fs.add_file(
        "./assets/src/js/lib/util.js",
        "function greet(name) {\n  return 'hi ' + name;\n}\n",
    );

    fs.add_file(
        "./assets/src/img/icons/dot.svg",
        concat!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"no\"?>\n",
            "<!-- Created with a vector editor. Document properties, guides and layer state follow. -->\n",
            "<svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"0 0 4 4\">\n",
            "  <!-- dot -->\n",
            "  <rect x=\"1\" y=\"1\" width=\"2\" height=\"2\"/>\n",
            "</svg>\n",
        ),
    );
    fs.add_file("./assets/src/fonts/sans.woff2", vec![0u8, 1, 2, 3]);
    fs.add_file("./assets/src/webfonts/icons.ttf", vec![9u8, 8, 7]);

    fs
}

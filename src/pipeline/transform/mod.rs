//! File-set transforms.
//!
//! | Pipe             | Effect                                              |
//! |------------------|-----------------------------------------------------|
//! | `Concat`         | join into one bundle                                |
//! | `OrderingList`   | explicit precedence by file name                    |
//! | `ModuleOrder`    | module declarations before their users              |
//! | `Annotate`       | array-annotate injectable functions                 |
//! | `MinifyJs/Css`   | minify, optionally with source maps                 |
//! | `MinifyMarkup`   | drop comments and collapse whitespace               |
//! | `StripComments`  | reprint scripts without comments                    |
//! | `RenameMin`      | `.min` suffix                                       |
//! | `RelocateFonts`  | normalize font paths against the styles directory   |
//! | `TemplateCache`  | partials to template-cache modules                  |
//! | `CompileStyles`  | external Sass/LESS compilers                        |
//! | `Inject`         | reference tags between index markers                |

mod annotate;
mod concat;
mod inject;
mod minify;
mod module_order;
mod order;
mod rename;
mod styles;
mod templates;

pub use annotate::Annotate;
pub use concat::Concat;
pub use inject::Inject;
pub use minify::{
    MinifyCss, MinifyJs, MinifyMarkup, StripComments, minify_css, minify_js, minify_markup,
    strip_comments,
};
pub use module_order::ModuleOrder;
pub use order::OrderingList;
pub use rename::{RelocateFonts, RenameMin, min_name, relocate_font};
pub use styles::CompileStyles;
pub use templates::TemplateCache;

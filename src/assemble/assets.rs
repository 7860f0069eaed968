//! Fonts and images.

use anyhow::Result;
use rustc_hash::FxHashSet;

use super::BuildContext;
use crate::core::Env;
use crate::pipeline::transform::RelocateFonts;
use crate::pipeline::{Chain, Dest, Merge, Source};
use crate::registry::{Category, Destination};
use crate::vendor::{FileKind, SpecialImages, VendorSource};

/// App fonts under `fonts/`, vendor fonts under the styles directory, both
/// relocated so that stylesheet `../fonts` references resolve.
pub fn fonts(ctx: &BuildContext<'_>, env: Env) -> Result<Chain> {
    let app = Chain::new("app-fonts")
        .then(Source::new(&ctx.registry, Category::Fonts))
        .then(RelocateFonts)
        .then(Dest::new(ctx.registry.dest(Destination::Fonts, env)));
    let vendor = Chain::new("vendor-fonts")
        .then(VendorSource::new(ctx.config, FileKind::Font).nested())
        .then(RelocateFonts)
        .then(Dest::new(ctx.registry.dest(Destination::VendorFonts, env)));

    Ok(Chain::new(format!("fonts-{env}")).then(Merge::new("fonts").branch(app).branch(vendor)))
}

/// App images under `images/`; vendor PNGs next to the vendor styles,
/// except those claimed by a special routing rule, which go to
/// `<styles>/<target>`.
pub fn images(ctx: &BuildContext<'_>, env: Env) -> Result<Chain> {
    let app = Chain::new("app-images")
        .then(Source::new(&ctx.registry, Category::Images))
        .then(Dest::new(ctx.registry.dest(Destination::Images, env)));

    let special = SpecialImages::new(ctx.config)?;
    let unrouted = special.clone();
    let vendor = Chain::new("vendor-images")
        .then(
            VendorSource::new(ctx.config, FileKind::Image)
                .only(move |file| unrouted.route(&file.relative).is_none()),
        )
        .then(Dest::new(ctx.registry.dest(Destination::VendorImages, env)));

    let mut merge = Merge::new("images").branch(app).branch(vendor);
    let mut seen = FxHashSet::default();
    for target in special.targets().filter(|t| seen.insert(*t)) {
        let rules = special.clone();
        let wanted = target.to_string();
        merge = merge.branch(
            Chain::new(format!("special-images-{target}"))
                .then(
                    VendorSource::new(ctx.config, FileKind::Image)
                        .only(move |file| rules.route(&file.relative) == Some(wanted.as_str())),
                )
                .then(Dest::new(ctx.registry.special_image_dest(env, target))),
        );
    }

    Ok(Chain::new(format!("images-{env}")).then(merge))
}

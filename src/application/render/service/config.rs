use comrak::options::Options;

/// Comrak options for the grammar-based transformer. Fixed at build time: there is
/// no runtime switch for extensions or sanitisation.
pub(crate) fn default_options() -> Options<'static> {
    let mut options = Options::default();
    configure_extensions(&mut options);
    options
}

fn configure_extensions(options: &mut Options<'static>) {
    let ext = &mut options.extension;
    ext.strikethrough = true;
    ext.tagfilter = false;
    ext.table = true;
    ext.autolink = true;

    let render = &mut options.render;
    render.hardbreaks = true;
    render.github_pre_lang = false;
    render.r#unsafe = true;
    render.sourcepos = false;
}

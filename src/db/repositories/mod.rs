mod annotations;
mod blobs;
mod captures;
mod overrides;
mod project_tags;
mod projects;
mod sessions;

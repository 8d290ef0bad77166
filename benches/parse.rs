use criterion::{black_box, criterion_group, criterion_main, Criterion};
use xmpcore::XmpMeta;

// Simple XMP packet with minimal properties
const SIMPLE_XMP: &str = r#"<?xpacket begin="" id="W5M0MpCehiHzreSzNTczkc9d"?>
<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
         xmlns:xmp="http://ns.adobe.com/xap/1.0/">
  <rdf:Description rdf:about=""
                   xmp:CreatorTool="Adobe Photoshop CS2 Windows"/>
</rdf:RDF>
<?xpacket end="w"?>"#;

// Medium complexity XMP packet with multiple properties and an array
const MEDIUM_XMP: &str = r#"<?xpacket begin="" id="W5M0MpCehiHzreSzNTczkc9d"?>
<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
         xmlns:xmp="http://ns.adobe.com/xap/1.0/"
         xmlns:dc="http://purl.org/dc/elements/1.1/"
         xmlns:exif="http://ns.adobe.com/exif/1.0/">
  <rdf:Description rdf:about=""
                   xmp:CreatorTool="Adobe Photoshop CS2 Windows"
                   xmp:CreateDate="2006-04-25T15:32:01+02:00"
                   xmp:ModifyDate="2006-04-27T15:38:36.655+02:00"
                   exif:PixelXDimension="200"
                   exif:PixelYDimension="200">
    <dc:subject>
      <rdf:Bag>
        <rdf:li>purple</rdf:li>
        <rdf:li>square</rdf:li>
        <rdf:li>test</rdf:li>
      </rdf:Bag>
    </dc:subject>
  </rdf:Description>
</rdf:RDF>
<?xpacket end="w"?>"#;

// Complex XMP packet with arrays, structures and language alternatives
const COMPLEX_XMP: &str = r#"<?xpacket begin="" id="W5M0MpCehiHzreSzNTczkc9d"?>
<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
         xmlns:xmp="http://ns.adobe.com/xap/1.0/"
         xmlns:dc="http://purl.org/dc/elements/1.1/"
         xmlns:xmpMM="http://ns.adobe.com/xap/1.0/mm/"
         xmlns:stEvt="http://ns.adobe.com/xap/1.0/sType/ResourceEvent#">
  <rdf:Description rdf:about=""
                   xmp:CreatorTool="Adobe Photoshop CS2 Windows"
                   xmpMM:DocumentID="uuid:FE607D9B5FD4DA118B7787757E22306B"
                   xmpMM:InstanceID="uuid:BF664E7B33D5DA119129F691B53239AD">
    <dc:title>
      <rdf:Alt>
        <rdf:li xml:lang="x-default">a test file</rdf:li>
        <rdf:li xml:lang="de">eine Testdatei</rdf:li>
      </rdf:Alt>
    </dc:title>
    <dc:creator>
      <rdf:Seq>
        <rdf:li>First Author</rdf:li>
        <rdf:li>Second Author</rdf:li>
      </rdf:Seq>
    </dc:creator>
    <xmpMM:History>
      <rdf:Seq>
        <rdf:li stEvt:action="created" stEvt:instanceID="xmp.iid:1"/>
        <rdf:li stEvt:action="saved" stEvt:instanceID="xmp.iid:2"/>
      </rdf:Seq>
    </xmpMM:History>
  </rdf:Description>
</rdf:RDF>
<?xpacket end="w"?>"#;

fn bench_parse_simple(c: &mut Criterion) {
    c.bench_function("parse_simple", |b| {
        b.iter(|| XmpMeta::parse(black_box(SIMPLE_XMP)).unwrap())
    });
}

fn bench_parse_medium(c: &mut Criterion) {
    c.bench_function("parse_medium", |b| {
        b.iter(|| XmpMeta::parse(black_box(MEDIUM_XMP)).unwrap())
    });
}

fn bench_parse_complex(c: &mut Criterion) {
    c.bench_function("parse_complex", |b| {
        b.iter(|| XmpMeta::parse(black_box(COMPLEX_XMP)).unwrap())
    });
}

criterion_group!(
    benches,
    bench_parse_simple,
    bench_parse_medium,
    bench_parse_complex
);
criterion_main!(benches);
